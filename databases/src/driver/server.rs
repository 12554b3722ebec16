//! PostgreSQL and MySQL drivers backed by sqlx
//!
//! sqlx is async; each connection lives on its own worker thread together
//! with a current-thread tokio runtime. Callers talk to the worker over
//! channels, so the blocking [`Connection`] contract holds whether or not the
//! caller is itself running inside a tokio runtime.

use super::{Connection, Driver, DriverError, ResultSet, Value};
use crate::target::Credentials;
use sqlx::{Column, Connection as _, Executor, Row, TypeInfo};
use std::future::Future;
use std::str::FromStr;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

#[cfg(feature = "mysql")]
use super::MYSQL_DRIVER;
#[cfg(feature = "postgres")]
use super::POSTGRES_DRIVER;
#[cfg(feature = "mysql")]
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
#[cfg(feature = "postgres")]
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};

type Job<C> = Box<dyn FnOnce(&mut C, &Runtime) + Send>;

enum Request<C> {
    Run(Job<C>),
    Close(mpsc::Sender<Result<(), DriverError>>),
}

/// Handle to a sqlx connection owned by a worker thread
///
/// Dropping the handle stops the worker, which then drops the connection and
/// its runtime on its own thread.
struct SqlxConnection<C> {
    sender: mpsc::Sender<Request<C>>,
    worker: Option<JoinHandle<()>>,
}

fn worker_stopped() -> DriverError {
    DriverError::Other("connection worker stopped".to_string())
}

impl<C: sqlx::Connection + 'static> SqlxConnection<C> {
    /// Start a worker thread and connect on it
    fn spawn<F, Fut>(name: &str, connect: F) -> Result<Self, DriverError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<C, sqlx::Error>>,
    {
        let (sender, receiver) = mpsc::channel::<Request<C>>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), DriverError>>();

        let worker = thread::Builder::new()
            .name(format!("sqlhub-{name}"))
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = init_tx.send(Err(e.into()));
                        return;
                    }
                };
                let conn = match runtime.block_on(connect()) {
                    Ok(conn) => conn,
                    Err(e) => {
                        let _ = init_tx.send(Err(e.into()));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));
                run_worker(conn, runtime, receiver);
            })?;

        match init_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                sender,
                worker: Some(worker),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => Err(worker_stopped()),
        }
    }

    /// Run `job` on the worker and wait for its result
    fn call<T, F>(&self, job: F) -> Result<T, DriverError>
    where
        T: Send + 'static,
        F: FnOnce(&mut C, &Runtime) -> Result<T, DriverError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let request = Request::Run(Box::new(move |conn: &mut C, runtime: &Runtime| {
            let _ = tx.send(job(conn, runtime));
        }));
        self.sender.send(request).map_err(|_| worker_stopped())?;
        rx.recv().map_err(|_| worker_stopped())?
    }

    fn shutdown(mut self) -> Result<(), DriverError> {
        let (tx, rx) = mpsc::channel();
        self.sender
            .send(Request::Close(tx))
            .map_err(|_| worker_stopped())?;
        let result = rx.recv().map_err(|_| worker_stopped())?;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        result
    }
}

fn run_worker<C: sqlx::Connection>(
    mut conn: C,
    runtime: Runtime,
    receiver: mpsc::Receiver<Request<C>>,
) {
    while let Ok(request) = receiver.recv() {
        match request {
            Request::Run(job) => job(&mut conn, &runtime),
            Request::Close(resp) => {
                let result = runtime.block_on(conn.close()).map_err(DriverError::from);
                let _ = resp.send(result);
                return;
            }
        }
    }
}

/// Decodes one column into a [`Value`], trying the widest compatible type first.
macro_rules! decode_value {
    ($row:expr, $index:expr) => {{
        let row = $row;
        let index = $index;
        if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
            value.map_or(Value::Null, Value::Integer)
        } else if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
            value.map_or(Value::Null, |v| Value::Integer(v.into()))
        } else if let Ok(value) = row.try_get::<Option<i16>, _>(index) {
            value.map_or(Value::Null, |v| Value::Integer(v.into()))
        } else if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
            value.map_or(Value::Null, Value::Real)
        } else if let Ok(value) = row.try_get::<Option<f32>, _>(index) {
            value.map_or(Value::Null, |v| Value::Real(v.into()))
        } else if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
            value.map_or(Value::Null, |v| Value::Integer(v.into()))
        } else if let Ok(value) = row.try_get::<Option<String>, _>(index) {
            value.map_or(Value::Null, Value::Text)
        } else if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
            value.map_or(Value::Null, Value::Blob)
        } else {
            Value::Text(format!("<{}>", row.column(index).type_info().name()))
        }
    }};
}

/// Implements [`Connection`] for a concrete sqlx connection type.
macro_rules! sqlx_connection {
    ($conn:ty, $decode:path) => {
        impl Connection for SqlxConnection<$conn> {
            fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
                let sql = sql.to_string();
                self.call(move |conn: &mut $conn, runtime: &Runtime| {
                    let done = runtime.block_on(conn.execute(sql.as_str()))?;
                    Ok(done.rows_affected())
                })
            }

            fn query(&mut self, sql: &str) -> Result<ResultSet, DriverError> {
                let sql = sql.to_string();
                self.call(move |conn: &mut $conn, runtime: &Runtime| {
                    let fetched = runtime.block_on(conn.fetch_all(sql.as_str()))?;

                    let columns = fetched
                        .first()
                        .map(|row| {
                            row.columns()
                                .iter()
                                .map(|column| column.name().to_string())
                                .collect()
                        })
                        .unwrap_or_default();
                    let rows = fetched.iter().map($decode).collect();

                    Ok(ResultSet { columns, rows })
                })
            }

            fn is_valid(&mut self) -> bool {
                self.call(|conn: &mut $conn, runtime: &Runtime| {
                    Ok(runtime.block_on(conn.ping())?)
                })
                .is_ok()
            }

            fn close(self: Box<Self>) -> Result<(), DriverError> {
                (*self).shutdown()
            }
        }
    };
}

/// Opens `postgres://host:port/database` descriptors
#[cfg(feature = "postgres")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

#[cfg(feature = "postgres")]
impl Driver for PostgresDriver {
    fn name(&self) -> &str {
        POSTGRES_DRIVER
    }

    fn connect(
        &self,
        descriptor: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>, DriverError> {
        debug!("Connecting to PostgreSQL: {descriptor}");

        let mut options = PgConnectOptions::from_str(descriptor)?;
        if let Some(credentials) = credentials {
            options = options
                .username(&credentials.username)
                .password(&credentials.password);
        }

        let conn = SqlxConnection::spawn(POSTGRES_DRIVER, move || async move {
            PgConnection::connect_with(&options).await
        })?;

        Ok(Box::new(conn))
    }
}

#[cfg(feature = "postgres")]
fn decode_pg_row(row: &PgRow) -> Vec<Value> {
    (0..row.len()).map(|index| decode_value!(row, index)).collect()
}

#[cfg(feature = "postgres")]
sqlx_connection!(PgConnection, decode_pg_row);

/// Opens `mysql://host:port/database` descriptors
#[cfg(feature = "mysql")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

#[cfg(feature = "mysql")]
impl Driver for MySqlDriver {
    fn name(&self) -> &str {
        MYSQL_DRIVER
    }

    fn connect(
        &self,
        descriptor: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>, DriverError> {
        debug!("Connecting to MySQL: {descriptor}");

        let mut options = MySqlConnectOptions::from_str(descriptor)?;
        if let Some(credentials) = credentials {
            options = options
                .username(&credentials.username)
                .password(&credentials.password);
        }

        let conn = SqlxConnection::spawn(MYSQL_DRIVER, move || async move {
            MySqlConnection::connect_with(&options).await
        })?;

        Ok(Box::new(conn))
    }
}

#[cfg(feature = "mysql")]
fn decode_mysql_row(row: &MySqlRow) -> Vec<Value> {
    (0..row.len())
        .map(|index| match row.try_get::<Option<u64>, _>(index) {
            // unsigned columns only; signed ones fall through
            Ok(value) => value.map_or(Value::Null, |v| {
                i64::try_from(v).map_or_else(|_| Value::Text(v.to_string()), Value::Integer)
            }),
            Err(_) => decode_value!(row, index),
        })
        .collect()
}

#[cfg(feature = "mysql")]
sqlx_connection!(MySqlConnection, decode_mysql_row);
