/// Cap-weighted sector treemap
///
/// Tiles are sized by total market cap and coloured by the cap-weighted
/// average change. This deliberately differs from the unweighted
/// `avg_return` used for ranking; both are emitted.

use serde::{Deserialize, Serialize};

use crate::models::{CrossSection, GroupMembership};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorMember {
    pub instrument_id: String,
    pub name: String,
    pub market_cap: f64,
    pub change_pct: f64,
    /// Share of the sector's total cap (%)
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorTile {
    pub sector: String,
    pub total_market_cap: f64,
    pub avg_change: f64,
    pub stock_count: usize,
    pub members: Vec<SectorMember>,
}

pub fn sector_treemap(sectors: &GroupMembership, cross_section: &CrossSection) -> Vec<SectorTile> {
    let rows = cross_section.index();

    let mut tiles: Vec<SectorTile> = sectors
        .groups()
        .iter()
        .filter_map(|sector| {
            let mut members: Vec<SectorMember> = sector
                .members
                .iter()
                .filter_map(|id| rows.get(id.as_str()))
                .filter(|row| row.is_trading())
                .filter_map(|row| {
                    let cap = row.market_cap.filter(|c| *c > 0.0)?;
                    Some(SectorMember {
                        instrument_id: row.instrument_id.clone(),
                        name: row.name.clone(),
                        market_cap: cap,
                        change_pct: row.change_pct()?,
                        weight: 0.0,
                    })
                })
                .collect();

            if members.is_empty() {
                return None;
            }

            let total: f64 = members.iter().map(|m| m.market_cap).sum();
            let avg_change = members.iter().map(|m| m.market_cap * m.change_pct).sum::<f64>() / total;
            for member in &mut members {
                member.weight = 100.0 * member.market_cap / total;
            }
            members.sort_by(|a, b| b.market_cap.total_cmp(&a.market_cap));

            Some(SectorTile {
                sector: sector.id.clone(),
                total_market_cap: total,
                avg_change,
                stock_count: members.len(),
                members,
            })
        })
        .collect();

    tiles.sort_by(|a, b| b.total_market_cap.total_cmp(&a.total_market_cap));
    tiles
}
