//! The score engine: categorical, multi-category, continuous, partial-sum,
//! probabilistic, neighborhood, and intensity-scale statistics, plus the
//! normal-theory confidence intervals they carry.

pub mod ci;
pub mod cnt;
pub mod contingency;
pub mod cts;
pub mod isc;
pub mod mcts;
pub mod nbr;
pub mod pct;
pub mod sums;

pub use ci::CiValue;
pub use cnt::{compute_cntinfo, compute_cntinfo_from_sums, compute_i_cntinfo, CntInfo, N_CNT_STATS};
pub use contingency::{MctsTable, ProbContingencyTable, TTContingencyTable};
pub use cts::{compute_ctsinfo, CtsInfo, N_CTS_STATS};
pub use isc::{compute_iscinfo, haar_components, IscInfo};
pub use mcts::{compute_mctsinfo, MctsInfo, N_MCTS_STATS};
pub use nbr::{compute_nbrcntinfo, coverage_pairs, CoveragePairs, NbrCntInfo, NbrCtsInfo, N_NBRCNT_STATS};
pub use pct::{compute_pctinfo, PctInfo};
pub use sums::{Sl1l2Info, Vl1l2Info};
