// Group (theme / sector) performance module
pub mod ranker;
pub mod sector;
pub mod selection;

pub use ranker::{GroupPerformance, GroupPerformanceRanker};
pub use sector::{sector_treemap, SectorMember, SectorTile};
pub use selection::{bottom, heatmap, select_extremes, top, HeatmapTile};
