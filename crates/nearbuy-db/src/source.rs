use nearbuy_core::{ShopQuery, ShopRecord, ShopSource};
use sqlx::PgPool;

use crate::shops::fetch_shops;
use crate::DbError;

/// [`ShopSource`] backed by the Postgres pool.
#[derive(Debug, Clone, Copy)]
pub struct PgShopSource<'a> {
    pool: &'a PgPool,
}

impl<'a> PgShopSource<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl ShopSource for PgShopSource<'_> {
    type Error = DbError;

    async fn fetch_shops(&self, query: &ShopQuery) -> Result<Vec<ShopRecord>, Self::Error> {
        fetch_shops(self.pool, query).await
    }
}
