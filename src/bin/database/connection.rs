use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use diesel::{Connection, ConnectionResult};
use tracing::{trace, trace_span};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub fn establish_pooled_connection(database_url: &str, max_size: u32) -> Result<PgPool, PoolError> {
    let span = trace_span!("establishing pooled connection");
    let _guard = span.enter();

    trace!("Creating manager");
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    trace!("Creating pool");
    Pool::builder().max_size(max_size).build(manager)
}

pub fn establish_connection(database_url: &str) -> ConnectionResult<PgConnection> {
    PgConnection::establish(database_url)
}
