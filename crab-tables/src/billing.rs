//! Bill computation
//!
//! Pure arithmetic over a closed session. All money uses `Decimal` and is
//! rounded to the currency's minor unit (2 places, half away from zero)
//! before summing, so `total_amount == time_cost + items_cost` holds exactly.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use shared::models::{Bill, ItemLine, SessionSnapshot};

const DECIMAL_PLACES: u32 = 2;
const MILLIS_PER_MINUTE: i64 = 60_000;

/// Round to the currency's minor unit
#[inline]
pub fn to_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Whole minutes billed for an occupancy
///
/// Partial minutes round up and the result is never below one, so a session
/// cannot occupy a table for free. A stop stamped before the start (clock
/// skew between clients) counts as zero elapsed.
pub fn billed_minutes(start_time: i64, end_time: i64) -> i64 {
    let elapsed = end_time.saturating_sub(start_time).max(0);
    let minutes = elapsed / MILLIS_PER_MINUTE + i64::from(elapsed % MILLIS_PER_MINUTE != 0);
    minutes.max(1)
}

/// Sum of quantity * unit price over all lines
pub fn items_cost(items: &[ItemLine]) -> Decimal {
    to_money(items.iter().map(ItemLine::line_total).sum())
}

/// Time cost for the billed minutes
pub fn time_cost(rate_per_minute: Decimal, minutes: i64) -> Decimal {
    to_money(rate_per_minute * Decimal::from(minutes))
}

/// Build the immutable bill for a stopped session
pub fn compute_bill(
    table_label: &str,
    snapshot: SessionSnapshot,
    end_time: i64,
    rate_per_minute: Decimal,
) -> Bill {
    let total_time_minutes = billed_minutes(snapshot.start_time, end_time);
    let time_cost = time_cost(rate_per_minute, total_time_minutes);
    let items_cost = items_cost(&snapshot.items);

    Bill {
        bill_id: Uuid::new_v4().to_string(),
        table_label: table_label.to_string(),
        session_id: snapshot.session_id,
        server_name: snapshot.server_name,
        start_time: snapshot.start_time,
        end_time,
        total_time_minutes,
        rate_per_minute,
        items: snapshot.items,
        time_cost,
        items_cost,
        total_amount: time_cost + items_cost,
    }
}
