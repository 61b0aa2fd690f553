use std::{
    io::{self, IoSlice},
    net::SocketAddr,
    os::fd::AsRawFd,
};

/// A `(level, name)` pair for `setsockopt`/`getsockopt`, matching the
/// socket-option category spec.md §4.6 describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOptionName {
    SendBufSize,
    RecvBufSize,
    ReuseAddr,
    NoDelay,
}

impl SocketOptionName {
    fn level_and_name(self) -> (libc::c_int, libc::c_int) {
        match self {
            SocketOptionName::SendBufSize => (libc::SOL_SOCKET, libc::SO_SNDBUF),
            SocketOptionName::RecvBufSize => (libc::SOL_SOCKET, libc::SO_RCVBUF),
            SocketOptionName::ReuseAddr => (libc::SOL_SOCKET, libc::SO_REUSEADDR),
            SocketOptionName::NoDelay => (libc::IPPROTO_TCP, libc::TCP_NODELAY),
        }
    }
}

/// The syscall-level contract a [`crate::channel::Channel`] consumes.
///
/// Kept as a trait (rather than hard-wiring `mio::net::TcpStream`
/// everywhere) so the channel, queue, and interest machine stay testable
/// against an in-memory fake; the only real implementation shipped here
/// is for `mio::net::TcpStream`.
pub trait Socket: mio::event::Source + Send {
    fn bind(&mut self, addr: SocketAddr) -> io::Result<()>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
    fn peer_addr(&self) -> io::Result<SocketAddr>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize>;
    fn shutdown(&mut self) -> io::Result<()>;
    fn set_so_option(&self, name: SocketOptionName, value: i32) -> io::Result<()>;
    fn get_so_option(&self, name: SocketOptionName) -> io::Result<i32>;
}

impl Socket for mio::net::TcpStream {
    /// Binding a socket that is already connected is rejected by the
    /// kernel (`EINVAL`); the channel reports that the same way it
    /// reports any other I/O error from `bind0`, so there is nothing
    /// special to do here beyond letting the syscall fail honestly.
    fn bind(&mut self, addr: SocketAddr) -> io::Result<()> {
        socket2::SockRef::from(self).bind(&addr.into())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        mio::net::TcpStream::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        mio::net::TcpStream::peer_addr(self)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        std::io::Read::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        std::io::Write::write(self, buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        std::io::Write::write_vectored(self, bufs)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        mio::net::TcpStream::shutdown(self, std::net::Shutdown::Both)
    }

    fn set_so_option(&self, name: SocketOptionName, value: i32) -> io::Result<()> {
        let (level, optname) = name.level_and_name();
        let rc = unsafe {
            libc::setsockopt(
                self.as_raw_fd(),
                level,
                optname,
                (&raw const value).cast(),
                std::mem::size_of::<i32>() as libc::socklen_t,
            )
        };
        if rc == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
    }

    fn get_so_option(&self, name: SocketOptionName) -> io::Result<i32> {
        let (level, optname) = name.level_and_name();
        let mut value: i32 = 0;
        let mut len = std::mem::size_of::<i32>() as libc::socklen_t;
        let rc = unsafe {
            libc::getsockopt(self.as_raw_fd(), level, optname, (&raw mut value).cast(), &raw mut len)
        };
        if rc == 0 { Ok(value) } else { Err(io::Error::last_os_error()) }
    }
}
