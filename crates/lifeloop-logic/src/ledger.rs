//! Resource ledger — consuming and producing substances from vessel storage.
//!
//! Shortage is never an error. Every withdrawal reports what fraction of
//! the request was met, and callers degrade proportionally or gate on it.
//!
//! Two apportionment strategies:
//! - **Networked** substances on a loaded vessel go through the host's
//!   plumbing in a single call ([`VesselHost::network_transfer`]).
//! - Everything else (manual substances, and every substance on a
//!   background vessel) is drained or filled container by container, in
//!   storage order, each up to its own amount or free space.

use serde::{Deserialize, Serialize};

use crate::config::EPSILON;
use crate::host::{Container, VesselHost};
use crate::substance::{FlowMode, Substance};

/// Result of a consume call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub taken: f64,
    /// `taken / requested`, clamped to [0, 1]. Exactly 1.0 for no-op requests.
    pub ratio: f64,
}

impl Withdrawal {
    /// A request too small to matter.
    pub const NOOP: Withdrawal = Withdrawal {
        taken: 0.0,
        ratio: 1.0,
    };

    /// Whether less than the full request was delivered.
    pub fn is_short(&self) -> bool {
        self.ratio < 1.0 - EPSILON
    }
}

/// Fraction of `requested` covered by `taken`.
pub fn satisfaction(requested: f64, taken: f64) -> f64 {
    if requested < EPSILON {
        return 1.0;
    }
    (taken / requested).clamp(0.0, 1.0)
}

/// Drain up to `amount` from containers in order. Returns the amount taken.
pub fn drain_containers<'a, I>(containers: I, amount: f64) -> f64
where
    I: IntoIterator<Item = &'a mut Container>,
{
    let mut remaining = amount.max(0.0);
    for container in containers {
        if remaining < EPSILON {
            break;
        }
        let take = container.amount.max(0.0).min(remaining);
        container.amount -= take;
        remaining -= take;
    }
    amount.max(0.0) - remaining
}

/// Fill up to `amount` into containers in order. Returns the amount stored.
pub fn fill_containers<'a, I>(containers: I, amount: f64) -> f64
where
    I: IntoIterator<Item = &'a mut Container>,
{
    let mut remaining = amount.max(0.0);
    for container in containers {
        if remaining < EPSILON {
            break;
        }
        let put = container.free_space().min(remaining);
        container.amount += put;
        remaining -= put;
    }
    amount.max(0.0) - remaining
}

fn uses_network<V: VesselHost + ?Sized>(host: &V, substance: Substance) -> bool {
    host.is_loaded() && substance.flow_mode() == FlowMode::Networked
}

/// Withdraw `amount` of a substance from anywhere on the vessel.
pub fn consume<V: VesselHost + ?Sized>(host: &mut V, substance: Substance, amount: f64) -> Withdrawal {
    if amount < EPSILON {
        return Withdrawal::NOOP;
    }
    let taken = if uses_network(host, substance) {
        host.network_transfer(substance, amount).clamp(0.0, amount)
    } else {
        drain_containers(
            host.containers_mut()
                .iter_mut()
                .filter(|c| c.substance == substance),
            amount,
        )
    };
    Withdrawal {
        taken,
        ratio: satisfaction(amount, taken),
    }
}

/// Store `amount` of a substance anywhere on the vessel. Excess is lost.
pub fn produce<V: VesselHost + ?Sized>(host: &mut V, substance: Substance, amount: f64) -> f64 {
    if amount < EPSILON {
        return 0.0;
    }
    if uses_network(host, substance) {
        host.network_transfer(substance, -amount).clamp(0.0, amount)
    } else {
        fill_containers(
            host.containers_mut()
                .iter_mut()
                .filter(|c| c.substance == substance),
            amount,
        )
    }
}

/// Total stored amount of a substance on the vessel.
pub fn total_available<V: VesselHost + ?Sized>(host: &V, substance: Substance) -> f64 {
    host.containers()
        .iter()
        .filter(|c| c.substance == substance)
        .map(|c| c.amount.max(0.0))
        .sum()
}

fn is_local(container: &Container, substance: Substance, habitat: usize) -> bool {
    container.substance == substance && container.habitat == Some(habitat)
}

/// Withdraw from the containers built into one habitat only.
pub fn consume_local<V: VesselHost + ?Sized>(
    host: &mut V,
    habitat: usize,
    substance: Substance,
    amount: f64,
) -> Withdrawal {
    if amount < EPSILON {
        return Withdrawal::NOOP;
    }
    let taken = drain_containers(
        host.containers_mut()
            .iter_mut()
            .filter(|c| is_local(c, substance, habitat)),
        amount,
    );
    Withdrawal {
        taken,
        ratio: satisfaction(amount, taken),
    }
}

/// Store into the containers built into one habitat only.
pub fn produce_local<V: VesselHost + ?Sized>(
    host: &mut V,
    habitat: usize,
    substance: Substance,
    amount: f64,
) -> f64 {
    if amount < EPSILON {
        return 0.0;
    }
    fill_containers(
        host.containers_mut()
            .iter_mut()
            .filter(|c| is_local(c, substance, habitat)),
        amount,
    )
}

pub fn available_local<V: VesselHost + ?Sized>(host: &V, habitat: usize, substance: Substance) -> f64 {
    host.containers()
        .iter()
        .filter(|c| is_local(c, substance, habitat))
        .map(|c| c.amount.max(0.0))
        .sum()
}
