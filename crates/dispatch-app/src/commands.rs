//! Subcommand handlers. Output goes to the given writer, logs go to stderr.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, bail};
use dispatch_api::{HttpOrdersApi, OrdersApi};
use dispatch_core::config::Settings;
use dispatch_core::time::format_start_time;
use dispatch_core::types::{AssignmentId, CastId, DateKey, OrderId, ShopId, partition_label};
use dispatch_service::{Assignment, AssignmentCache, CacheOptions, CastRef};
use dispatch_store::{FileStore, KeyValueStore};

use crate::cli::{Command, DateArg};

/// Everything a subcommand needs, wired from `Settings`.
pub struct App {
    settings: Settings,
    api: Arc<dyn OrdersApi>,
    cache: AssignmentCache,
}

impl App {
    /// ## Summary
    /// Wires the HTTP Orders API client and the on-disk store from `settings`.
    ///
    /// ## Errors
    /// Returns an error if the API client or the store directory cannot be set up,
    /// or if called outside a tokio runtime.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let api = HttpOrdersApi::new(&settings.api).context("building Orders API client")?;
        let store = FileStore::open(&settings.store.path)
            .with_context(|| format!("opening store at {}", settings.store.path.display()))?;
        Self::with_parts(settings, Arc::new(api), Arc::new(store))
    }

    /// ## Errors
    /// Returns an error if called outside a tokio runtime.
    pub fn with_parts(
        settings: Settings,
        api: Arc<dyn OrdersApi>,
        store: Arc<dyn KeyValueStore>,
    ) -> anyhow::Result<Self> {
        let options = CacheOptions::from_settings(&settings);
        let cache = AssignmentCache::new(Arc::clone(&api), store, options)?;
        Ok(Self {
            settings,
            api,
            cache,
        })
    }

    #[must_use]
    pub const fn cache(&self) -> &AssignmentCache {
        &self.cache
    }

    /// ## Summary
    /// Runs one subcommand, then waits for background pushes to finish.
    ///
    /// ## Errors
    /// Returns an error for invalid arguments, explicit Orders API calls that
    /// fail, or output that cannot be written.
    pub async fn run(&self, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
        let result = self.dispatch(command, out).await;
        self.cache.flush().await;
        result
    }

    async fn dispatch(&self, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
        match command {
            Command::Show { date } => self.show(date, out).await,
            Command::Orders { date } => self.orders(date, out).await,
            Command::Assign {
                date,
                shop,
                cast_id,
                cast_code,
                cast_name,
                rate,
                note,
                order,
            } => {
                let mut row = Assignment::for_cast(
                    ShopId::from(shop),
                    CastRef {
                        id: cast_id.map(CastId::from),
                        code: cast_code,
                        name: cast_name,
                    },
                )
                .with_rate(rate);
                if let Some(note) = note {
                    row = row.with_note(note);
                }
                if let Some(order) = order {
                    row = row.with_order(OrderId::from(order));
                }
                self.assign(date, row, out).await
            }
            Command::Unassign {
                date,
                assignment_id,
            } => {
                self.unassign(date, &AssignmentId::from(assignment_id), out)
                    .await
            }
            Command::Confirm { order_id } => {
                let order_id = OrderId::from(order_id);
                self.api.confirm_order(&order_id).await?;
                tracing::info!(order_id = %order_id, "Order confirmed");
                writeln!(out, "confirmed {order_id}")?;
                Ok(())
            }
            Command::Cancel { order_id } => {
                let order_id = OrderId::from(order_id);
                self.api.cancel_order(&order_id).await?;
                tracing::info!(order_id = %order_id, "Order cancelled");
                writeln!(out, "cancelled {order_id}")?;
                Ok(())
            }
        }
    }

    fn partition(&self, date: DateArg) -> anyhow::Result<Option<DateKey>> {
        let tz = self.settings.cache.time_zone()?;
        Ok(date.resolve(tz)?)
    }

    /// Serves local rows first, then waits for the background reconciliation
    /// and prints whatever the cache holds afterwards.
    async fn show(&self, date: DateArg, out: &mut impl Write) -> anyhow::Result<()> {
        let key = self.partition(date)?;
        let interim = self.cache.load(key.as_ref());
        tracing::debug!(rows = interim.len(), "Served local rows");
        self.cache.refresh(key.as_ref()).await;
        let rows = self.cache.load(key.as_ref());
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        Ok(())
    }

    async fn orders(&self, date: DateArg, out: &mut impl Write) -> anyhow::Result<()> {
        let key = self.partition(date)?;
        let orders = self.api.list_orders(key.as_ref()).await?;
        for order in &orders {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                order.id,
                order.shop_id,
                order.order_no.map(|no| no.to_string()).unwrap_or_default(),
                order.start_time.map(format_start_time).unwrap_or_default(),
                order.status,
            )?;
        }
        Ok(())
    }

    /// Current rows of a dated partition, reconciled when the API answers.
    /// A successful reconciliation replaces local-only rows (skipped or
    /// failed pushes) with the server's list before the edit is applied.
    async fn editable_rows(&self, key: DateKey) -> Vec<Assignment> {
        match self.cache.refresh_now(Some(&key)).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(date = %key, error = %e, "Orders API unavailable, editing local rows");
                self.cache.load(Some(&key))
            }
        }
    }

    /// Appends `row` to the partition as the Orders API currently sees it.
    /// Rows that only ever existed locally are dropped when the API answers;
    /// when it does not, the edit applies to the local rows instead.
    async fn assign(
        &self,
        date: DateArg,
        row: Assignment,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let Some(key) = self.partition(date)? else {
            bail!("assignments need a date, not {}", partition_label(None));
        };
        row.validate()?;

        let mut rows = self.editable_rows(key).await;
        writeln!(out, "{}", row.id)?;
        rows.push(row);
        self.cache.save(rows, Some(&key));
        Ok(())
    }

    async fn unassign(
        &self,
        date: DateArg,
        assignment_id: &AssignmentId,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let Some(key) = self.partition(date)? else {
            bail!("assignments need a date, not {}", partition_label(None));
        };

        let mut rows = self.editable_rows(key).await;
        let before = rows.len();
        rows.retain(|row| &row.id != assignment_id);
        if rows.len() == before {
            bail!("no assignment {assignment_id} on {key}");
        }
        self.cache.save(rows, Some(&key));
        writeln!(out, "removed {assignment_id}")?;
        Ok(())
    }
}
