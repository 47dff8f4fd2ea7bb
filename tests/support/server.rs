#![allow(unused)]
use std::{
    convert::Infallible, future::Future, net, sync::mpsc as std_mpsc, thread, time::Duration,
};

use bytes::Bytes;
use http_body_util::Full;
use tokio::{runtime, sync::oneshot};

pub struct Server {
    addr: net::SocketAddr,
    panic_rx: std_mpsc::Receiver<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Server {
    pub fn addr(&self) -> net::SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if !thread::panicking() {
            self.panic_rx
                .recv_timeout(Duration::from_secs(3))
                .expect("test server should not panic");
        }
    }
}

pub fn http<F, Fut>(func: F) -> Server
where
    F: Fn(http::Request<hyper::body::Incoming>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = http::Response<Full<Bytes>>> + Send + 'static,
{
    // Spawn a new runtime in a thread to prevent reactor execution context
    // conflicts between the test and the server.
    let test_name = thread::current().name().unwrap_or("<unknown>").to_string();
    let (addr_tx, addr_rx) = std_mpsc::channel();
    let (panic_tx, panic_rx) = std_mpsc::channel();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    thread::Builder::new()
        .name(format!("test({test_name})-support-server"))
        .spawn(move || {
            let rt = runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("new rt");

            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind(&net::SocketAddr::from((
                    [127, 0, 0, 1],
                    0,
                )))
                .await
                .unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();

                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => break,
                        accepted = listener.accept() => {
                            let (io, _) = accepted.expect("accepted");
                            let func = func.clone();
                            tokio::spawn(async move {
                                let svc = hyper::service::service_fn(move |req| {
                                    let fut = func(req);
                                    async move { Ok::<_, Infallible>(fut.await) }
                                });
                                let builder = hyper_util::server::conn::auto::Builder::new(
                                    hyper_util::rt::TokioExecutor::new(),
                                );
                                let _ = builder
                                    .serve_connection(hyper_util::rt::TokioIo::new(io), svc)
                                    .await;
                            });
                        }
                    }
                }
            });

            let _ = panic_tx.send(());
        })
        .expect("support server thread");

    let addr = addr_rx.recv().expect("server addr");
    Server {
        addr,
        panic_rx,
        shutdown_tx: Some(shutdown_tx),
    }
}
