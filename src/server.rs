use std::{
    io,
    net::{SocketAddr, TcpListener, ToSocketAddrs},
};

use threadpool::ThreadPool;
use tracing::{debug, warn};

use crate::{connection::Connection, serve, App};

/// Accepts TCP connections and hands each one to a pool thread running the
/// per-connection serve loop.
pub struct Server<'a> {
    thread_pool: ThreadPool,
    local_addr: Option<SocketAddr>,
    incoming: Box<dyn Iterator<Item = Connection> + Send + 'a>,
}

impl<'a> Server<'a> {
    /// The address the listener is bound to. Useful with port 0 binds.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn serve<Handle>(self, app: Handle) -> io::Result<()>
    where
        Handle: App,
        Handle: Send + Clone + 'static,
    {
        for conn in self.incoming {
            let app = app.clone();
            self.thread_pool.execute(move || {
                let peer = conn.peer_addr();
                if let Err(err) = serve(conn, app) {
                    debug!(?peer, %err, "connection ended with error");
                }
            });
        }

        Ok(())
    }

    pub fn builder() -> ServerBuilder {
        Default::default()
    }

    pub fn bind<A: ToSocketAddrs>(addr: A) -> Server<'static> {
        Self::builder().bind(addr)
    }
}

pub struct ServerBuilder {
    max_threads: usize,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self { max_threads: 512 }
    }
}

impl ServerBuilder {
    pub fn max_threads(self, max_threads: usize) -> Self {
        Self { max_threads }
    }

    /// Builds a server from an arbitrary connection source. The seam used
    /// by tests to feed pre-made connections.
    pub fn from_connections<'a, T>(self, conns: T) -> Server<'a>
    where
        T: IntoIterator<Item = Connection> + 'a,
        T::IntoIter: Send,
    {
        Server {
            thread_pool: ThreadPool::new(self.max_threads),
            local_addr: None,
            incoming: Box::new(conns.into_iter()),
        }
    }

    pub fn bind<A: ToSocketAddrs>(self, addr: A) -> Server<'static> {
        self.try_bind(addr).unwrap()
    }

    pub fn try_bind<A: ToSocketAddrs>(self, addr: A) -> io::Result<Server<'static>> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr().ok();

        Ok(Server {
            thread_pool: ThreadPool::new(self.max_threads),
            local_addr,
            incoming: Box::new(TcpAcceptor { listener }),
        })
    }
}

struct TcpAcceptor {
    listener: TcpListener,
}

impl Iterator for TcpAcceptor {
    type Item = Connection;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.listener.accept() {
                Ok((conn, _addr)) => return Some(conn.into()),
                Err(err) => {
                    warn!(%err, "failed to accept connection");
                    continue;
                }
            }
        }
    }
}
