use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{AuditConfig, ShortCodePolicy, SuccessPredicate};
use crate::error::{AuditError, AuditResult, Stage};
use crate::types::{
    AuditReport, CourierSummaryRow, DeliveryRanking, DeliveryRankingRow, Field, IncidentRow,
    MicroHubCandidate, PostalCodeProfileRow, RankingKind, ShipmentRecord, SummaryStats,
};
use crate::util::{normalize_postal_code, percentage, postal_prefix};

/// Per-courier totals, successful deliveries and effectiveness.
///
/// Every courier present in `data` gets a row; one with no successful
/// deliveries reports `successful = 0` and `effectiveness = 0`.
pub fn generate_courier_summary<P>(
    data: &[ShipmentRecord],
    rule: &P,
) -> AuditResult<Vec<CourierSummaryRow>>
where
    P: SuccessPredicate + ?Sized,
{
    let mut totals: HashMap<&str, usize> = HashMap::new();
    let mut successes: HashMap<&str, usize> = HashMap::new();
    for (idx, r) in data.iter().enumerate() {
        let courier = r.require(Field::Courier, Stage::CourierSummary, idx)?;
        let status = r.require(Field::StatusText, Stage::CourierSummary, idx)?;
        *totals.entry(courier).or_default() += 1;
        if rule.is_success(status) {
            *successes.entry(courier).or_default() += 1;
        }
    }

    let mut rows: Vec<CourierSummaryRow> = totals
        .into_iter()
        .map(|(courier, total)| {
            let successful = successes.get(courier).copied().unwrap_or(0);
            CourierSummaryRow {
                courier: courier.to_string(),
                total,
                successful,
                effectiveness: percentage(successful, total),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.effectiveness
            .partial_cmp(&a.effectiveness)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.courier.cmp(&b.courier))
    });
    debug!(couriers = rows.len(), "courier summary built");
    Ok(rows)
}

/// Shipment volume, share and dominant product per normalized postal code,
/// ordered by volume descending then code ascending.
pub fn generate_postal_profile(data: &[ShipmentRecord]) -> AuditResult<Vec<PostalCodeProfileRow>> {
    #[derive(Default)]
    struct Acc {
        shipments: usize,
        products: BTreeMap<String, usize>,
    }

    let mut map: HashMap<String, Acc> = HashMap::new();
    for (idx, r) in data.iter().enumerate() {
        let code = r.require(Field::PostalCode, Stage::GeographicProfile, idx)?;
        let product = r.require(Field::Product, Stage::GeographicProfile, idx)?;
        let e = map.entry(normalize_postal_code(code)).or_default();
        e.shipments += 1;
        *e.products.entry(product.to_string()).or_default() += 1;
    }

    let total = data.len();
    let mut rows: Vec<PostalCodeProfileRow> = map
        .into_iter()
        .map(|(postal_code, acc)| PostalCodeProfileRow {
            postal_code,
            shipments: acc.shipments,
            share_pct: percentage(acc.shipments, total),
            dominant_product: dominant_product(&acc.products),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.shipments
            .cmp(&a.shipments)
            .then_with(|| a.postal_code.cmp(&b.postal_code))
    });
    debug!(postal_codes = rows.len(), "postal profile built");
    Ok(rows)
}

// Highest count wins; on a tie the product that sorts first is kept.
fn dominant_product(products: &BTreeMap<String, usize>) -> String {
    let mut best: Option<(&String, usize)> = None;
    for (product, &count) in products {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((product, count));
        }
    }
    best.map(|(p, _)| p.clone()).unwrap_or_default()
}

/// One micro-hub candidate per 3-character prefix among the `pool`
/// highest-volume postal codes, ordered by prefix.
///
/// Only the top `pool` codes are considered, so prefixes that appear
/// further down the profile never produce a candidate.
pub fn select_micro_hubs(
    profile: &[PostalCodeProfileRow],
    pool: usize,
    policy: ShortCodePolicy,
) -> AuditResult<Vec<MicroHubCandidate>> {
    let mut ranked: Vec<&PostalCodeProfileRow> = profile.iter().collect();
    ranked.sort_by(|a, b| b.shipments.cmp(&a.shipments));

    let mut best: BTreeMap<String, &PostalCodeProfileRow> = BTreeMap::new();
    for row in ranked.into_iter().take(pool) {
        let Some(prefix) = postal_prefix(&row.postal_code) else {
            match policy {
                ShortCodePolicy::Skip => {
                    warn!(code = %row.postal_code, "postal code too short for a hub prefix, skipped");
                    continue;
                }
                ShortCodePolicy::Reject => {
                    return Err(AuditError::InvalidPostalCode {
                        code: row.postal_code.clone(),
                    });
                }
            }
        };
        match best.entry(prefix) {
            Entry::Vacant(e) => {
                e.insert(row);
            }
            Entry::Occupied(mut e) => {
                if row.shipments > e.get().shipments {
                    e.insert(row);
                }
            }
        }
    }

    let hubs: Vec<MicroHubCandidate> = best
        .into_iter()
        .map(|(prefix, row)| MicroHubCandidate {
            prefix,
            postal_code: row.postal_code.clone(),
            shipments: row.shipments,
        })
        .collect();
    debug!(candidates = hubs.len(), "micro-hubs selected");
    Ok(hubs)
}

/// Occurrences per (courier, status) pair, most frequent first.
pub fn generate_incidents(data: &[ShipmentRecord]) -> AuditResult<Vec<IncidentRow>> {
    let mut map: HashMap<(&str, &str), usize> = HashMap::new();
    for (idx, r) in data.iter().enumerate() {
        let courier = r.require(Field::Courier, Stage::Incidents, idx)?;
        let reason = r.require(Field::StatusText, Stage::Incidents, idx)?;
        *map.entry((courier, reason)).or_default() += 1;
    }

    let mut rows: Vec<IncidentRow> = map
        .into_iter()
        .map(|((courier, reason), occurrences)| IncidentRow {
            courier: courier.to_string(),
            reason: reason.to_string(),
            occurrences,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.courier.cmp(&b.courier))
            .then_with(|| a.reason.cmp(&b.reason))
    });
    debug!(pairs = rows.len(), "incidents aggregated");
    Ok(rows)
}

/// Couriers with the most and the fewest successful deliveries.
pub fn generate_delivery_ranking(
    couriers: &[CourierSummaryRow],
    total_shipments: usize,
    size: usize,
) -> DeliveryRanking {
    let rank = |kind: RankingKind, mut rows: Vec<&CourierSummaryRow>| -> Vec<DeliveryRankingRow> {
        rows.sort_by(|a, b| {
            let by_count = match kind {
                RankingKind::Most => b.successful.cmp(&a.successful),
                RankingKind::Fewest => a.successful.cmp(&b.successful),
            };
            by_count.then_with(|| a.courier.cmp(&b.courier))
        });
        rows.into_iter()
            .take(size)
            .enumerate()
            .map(|(idx, c)| DeliveryRankingRow {
                kind,
                rank: idx + 1,
                courier: c.courier.clone(),
                successful: c.successful,
                share_pct: percentage(c.successful, total_shipments),
            })
            .collect()
    };

    DeliveryRanking {
        most: rank(RankingKind::Most, couriers.iter().collect()),
        fewest: rank(RankingKind::Fewest, couriers.iter().collect()),
    }
}

pub fn generate_summary(
    data: &[ShipmentRecord],
    couriers: &[CourierSummaryRow],
    profile: &[PostalCodeProfileRow],
    hubs: &[MicroHubCandidate],
) -> SummaryStats {
    let successful: usize = couriers.iter().map(|c| c.successful).sum();
    SummaryStats {
        total_shipments: data.len(),
        total_couriers: couriers.len(),
        total_postal_codes: profile.len(),
        overall_effectiveness: percentage(successful, data.len()),
        micro_hubs: hubs.len(),
        generated_at: Utc::now(),
    }
}

/// Run every stage over one loaded table.
pub fn run_audit(data: &[ShipmentRecord], config: &AuditConfig) -> AuditResult<AuditReport> {
    if data.is_empty() {
        return Err(AuditError::EmptyInput);
    }
    let matcher = config.success.matcher();
    let couriers = generate_courier_summary(data, &matcher)?;
    let postal_profile = generate_postal_profile(data)?;
    let micro_hubs = select_micro_hubs(
        &postal_profile,
        config.limits.hub_pool,
        config.short_code_policy,
    )?;
    let incidents = generate_incidents(data)?;
    let ranking = generate_delivery_ranking(&couriers, data.len(), config.limits.ranking_size);
    let summary = generate_summary(data, &couriers, &postal_profile, &micro_hubs);
    info!(
        shipments = summary.total_shipments,
        couriers = summary.total_couriers,
        postal_codes = summary.total_postal_codes,
        micro_hubs = summary.micro_hubs,
        "audit complete"
    );
    Ok(AuditReport {
        couriers,
        postal_profile,
        micro_hubs,
        incidents,
        ranking,
        summary,
    })
}
