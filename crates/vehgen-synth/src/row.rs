//! One synthetic row per call, one value per column, in column order.
//!
//! Two independent instants are drawn per row: `display` feeds the `ts`
//! column, `base` anchors `backend_ts`. They are not correlated, so
//! `backend_ts` may precede `ts` in the same row.

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use uuid::Uuid;

use vehgen_core::config::GeoBounds;
use vehgen_core::day::{format_timestamp, SECONDS_PER_DAY};
use vehgen_core::schema::{ColumnDef, ColumnRole, ColumnSpec};

use crate::value::{random_in_range, truncate_decimal, typed_value, GEO_WIDTH};
use crate::vins::VinPool;

/// Exclusive upper bound of the `backend_ts` lag, in seconds.
pub const BACKEND_LAG_SECS: u32 = 30;

/// Probability that a generic column gets a value instead of staying empty.
pub const FILL_PROBABILITY: f64 = 0.5;

/// Per-row instants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowContext {
    pub base: NaiveDateTime,
    pub display: String,
}

impl RowContext {
    pub fn draw<R: Rng + ?Sized>(day_start: NaiveDateTime, rng: &mut R) -> Self {
        let base = offset_secs(day_start, rng.random_range(0..SECONDS_PER_DAY));
        let display = offset_secs(day_start, rng.random_range(0..SECONDS_PER_DAY));
        Self {
            base,
            display: format_timestamp(display),
        }
    }
}

pub struct RowSynthesizer<'a> {
    columns: &'a ColumnSpec,
    vins: &'a VinPool,
    geo: GeoBounds,
}

impl<'a> RowSynthesizer<'a> {
    pub fn new(columns: &'a ColumnSpec, vins: &'a VinPool, geo: GeoBounds) -> Self {
        Self { columns, vins, geo }
    }

    pub fn generate_row<R: Rng + ?Sized>(
        &self,
        day_start: NaiveDateTime,
        rng: &mut R,
    ) -> Vec<String> {
        let ctx = RowContext::draw(day_start, rng);
        self.columns
            .iter()
            .map(|col| self.column_value(col, &ctx, rng))
            .collect()
    }

    /// `generate_row` joined with `,` (no newline).
    pub fn render_row<R: Rng + ?Sized>(&self, day_start: NaiveDateTime, rng: &mut R) -> String {
        self.generate_row(day_start, rng).join(",")
    }

    fn column_value<R: Rng + ?Sized>(
        &self,
        col: &ColumnDef,
        ctx: &RowContext,
        rng: &mut R,
    ) -> String {
        match col.role {
            ColumnRole::Vin => self.vins.pick(rng).unwrap_or_default().to_string(),
            ColumnRole::Timestamp => ctx.display.clone(),
            ColumnRole::BackendTimestamp => {
                format_timestamp(offset_secs(ctx.base, rng.random_range(0..BACKEND_LAG_SECS)))
            }
            ColumnRole::TraceId => Uuid::new_v4().to_string(),
            ColumnRole::Longitude => truncate_decimal(
                random_in_range(self.geo.lon_min, self.geo.lon_max, rng),
                GEO_WIDTH,
            ),
            ColumnRole::Latitude => truncate_decimal(
                random_in_range(self.geo.lat_min, self.geo.lat_max, rng),
                GEO_WIDTH,
            ),
            ColumnRole::Generic => {
                if rng.random_bool(FILL_PROBABILITY) {
                    typed_value(col.value_type, rng)
                } else {
                    String::new()
                }
            }
        }
    }
}

fn offset_secs(at: NaiveDateTime, secs: u32) -> NaiveDateTime {
    at.checked_add_signed(Duration::seconds(i64::from(secs)))
        .unwrap_or(at)
}
