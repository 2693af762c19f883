//! The row-sink contract: one append method per output line family.
//!
//! The core emits typed records; text/table formatting belongs to the
//! collaborating writer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::interp::InterpMethod;
use crate::pairs::MatchedPair;
use crate::stats::{
    CntInfo, CtsInfo, IscInfo, MctsInfo, MctsTable, NbrCntInfo, NbrCtsInfo, PctInfo, Sl1l2Info,
    TTContingencyTable, Vl1l2Info,
};
use crate::types::Threshold;

/// Header context shared by every output row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowHeader {
    pub model: String,
    pub fcst_var: String,
    pub fcst_lev: String,
    pub obs_var: String,
    pub obs_lev: String,
    pub msg_type: String,
    pub mask_name: String,
    pub interp_mthd: Option<InterpMethod>,
    pub interp_width: usize,
    pub valid_beg: DateTime<Utc>,
    pub valid_end: DateTime<Utc>,
    pub alpha: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FhoRow {
    pub header: RowHeader,
    pub fcst_thresh: Threshold,
    pub obs_thresh: Threshold,
    pub total: u64,
    pub f_rate: f64,
    pub h_rate: f64,
    pub o_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CtcRow {
    pub header: RowHeader,
    pub fcst_thresh: Threshold,
    pub obs_thresh: Threshold,
    pub table: TTContingencyTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CtsRow {
    pub header: RowHeader,
    pub info: CtsInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MctcRow {
    pub header: RowHeader,
    pub table: MctsTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MctsRow {
    pub header: RowHeader,
    pub info: MctsInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CntRow {
    pub header: RowHeader,
    pub info: CntInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sl1l2Row {
    pub header: RowHeader,
    pub sums: Sl1l2Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sal1l2Row {
    pub header: RowHeader,
    pub sums: Sl1l2Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vl1l2Row {
    pub header: RowHeader,
    pub sums: Vl1l2Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Val1l2Row {
    pub header: RowHeader,
    pub sums: Vl1l2Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PctRow {
    pub header: RowHeader,
    pub info: PctInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PstdRow {
    pub header: RowHeader,
    pub info: PctInfo,
}

/// Joint/conditional factorizations of the probabilistic table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PjcRow {
    pub header: RowHeader,
    /// `(bin probability, calibration, refinement)` per bin.
    pub calibration: Vec<(f64, f64, f64)>,
    /// `(bin probability, likelihood, base rate)` per bin.
    pub likelihood: Vec<(f64, f64, f64)>,
}

/// ROC points of the probabilistic table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrcRow {
    pub header: RowHeader,
    /// `(threshold, POD, POFD)` per probability threshold.
    pub roc: Vec<(f64, f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NbrCtcRow {
    pub header: RowHeader,
    pub width: usize,
    pub fcst_thresh: Threshold,
    pub obs_thresh: Threshold,
    pub frac_thresh: Threshold,
    pub table: TTContingencyTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NbrCtsRow {
    pub header: RowHeader,
    pub info: NbrCtsInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NbrCntRow {
    pub header: RowHeader,
    pub info: NbrCntInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IscRow {
    pub header: RowHeader,
    pub info: IscInfo,
}

/// One matched pair, emitted for downstream aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MprRow {
    pub header: RowHeader,
    pub index: usize,
    pub pair: MatchedPair,
}

/// Append-only sink for output rows; one method per line family.
pub trait RowSink {
    fn append_fho(&mut self, row: FhoRow) -> Result<()>;
    fn append_ctc(&mut self, row: CtcRow) -> Result<()>;
    fn append_cts(&mut self, row: CtsRow) -> Result<()>;
    fn append_mctc(&mut self, row: MctcRow) -> Result<()>;
    fn append_mcts(&mut self, row: MctsRow) -> Result<()>;
    fn append_cnt(&mut self, row: CntRow) -> Result<()>;
    fn append_sl1l2(&mut self, row: Sl1l2Row) -> Result<()>;
    fn append_sal1l2(&mut self, row: Sal1l2Row) -> Result<()>;
    fn append_vl1l2(&mut self, row: Vl1l2Row) -> Result<()>;
    fn append_val1l2(&mut self, row: Val1l2Row) -> Result<()>;
    fn append_pct(&mut self, row: PctRow) -> Result<()>;
    fn append_pstd(&mut self, row: PstdRow) -> Result<()>;
    fn append_pjc(&mut self, row: PjcRow) -> Result<()>;
    fn append_prc(&mut self, row: PrcRow) -> Result<()>;
    fn append_nbrctc(&mut self, row: NbrCtcRow) -> Result<()>;
    fn append_nbrcts(&mut self, row: NbrCtsRow) -> Result<()>;
    fn append_nbrcnt(&mut self, row: NbrCntRow) -> Result<()>;
    fn append_isc(&mut self, row: IscRow) -> Result<()>;
    fn append_mpr(&mut self, row: MprRow) -> Result<()>;
}

/// Tagged row record, keyed by output family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RowRecord {
    Fho(FhoRow),
    Ctc(CtcRow),
    Cts(CtsRow),
    Mctc(MctcRow),
    Mcts(MctsRow),
    Cnt(CntRow),
    Sl1l2(Sl1l2Row),
    Sal1l2(Sal1l2Row),
    Vl1l2(Vl1l2Row),
    Val1l2(Val1l2Row),
    Pct(PctRow),
    Pstd(PstdRow),
    Pjc(PjcRow),
    Prc(PrcRow),
    NbrCtc(NbrCtcRow),
    NbrCts(NbrCtsRow),
    NbrCnt(NbrCntRow),
    Isc(IscRow),
    Mpr(MprRow),
}

/// Sink writing each row as one JSON object per line, for collaborating
/// writers that post-process rows out of band.
pub struct JsonLinesSink<W: std::io::Write> {
    writer: W,
}

impl<W: std::io::Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, row: &RowRecord) -> Result<()> {
        let line = serde_json::to_string(row)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: std::io::Write> RowSink for JsonLinesSink<W> {
    fn append_fho(&mut self, row: FhoRow) -> Result<()> {
        self.write(&RowRecord::Fho(row))
    }

    fn append_ctc(&mut self, row: CtcRow) -> Result<()> {
        self.write(&RowRecord::Ctc(row))
    }

    fn append_cts(&mut self, row: CtsRow) -> Result<()> {
        self.write(&RowRecord::Cts(row))
    }

    fn append_mctc(&mut self, row: MctcRow) -> Result<()> {
        self.write(&RowRecord::Mctc(row))
    }

    fn append_mcts(&mut self, row: MctsRow) -> Result<()> {
        self.write(&RowRecord::Mcts(row))
    }

    fn append_cnt(&mut self, row: CntRow) -> Result<()> {
        self.write(&RowRecord::Cnt(row))
    }

    fn append_sl1l2(&mut self, row: Sl1l2Row) -> Result<()> {
        self.write(&RowRecord::Sl1l2(row))
    }

    fn append_sal1l2(&mut self, row: Sal1l2Row) -> Result<()> {
        self.write(&RowRecord::Sal1l2(row))
    }

    fn append_vl1l2(&mut self, row: Vl1l2Row) -> Result<()> {
        self.write(&RowRecord::Vl1l2(row))
    }

    fn append_val1l2(&mut self, row: Val1l2Row) -> Result<()> {
        self.write(&RowRecord::Val1l2(row))
    }

    fn append_pct(&mut self, row: PctRow) -> Result<()> {
        self.write(&RowRecord::Pct(row))
    }

    fn append_pstd(&mut self, row: PstdRow) -> Result<()> {
        self.write(&RowRecord::Pstd(row))
    }

    fn append_pjc(&mut self, row: PjcRow) -> Result<()> {
        self.write(&RowRecord::Pjc(row))
    }

    fn append_prc(&mut self, row: PrcRow) -> Result<()> {
        self.write(&RowRecord::Prc(row))
    }

    fn append_nbrctc(&mut self, row: NbrCtcRow) -> Result<()> {
        self.write(&RowRecord::NbrCtc(row))
    }

    fn append_nbrcts(&mut self, row: NbrCtsRow) -> Result<()> {
        self.write(&RowRecord::NbrCts(row))
    }

    fn append_nbrcnt(&mut self, row: NbrCntRow) -> Result<()> {
        self.write(&RowRecord::NbrCnt(row))
    }

    fn append_isc(&mut self, row: IscRow) -> Result<()> {
        self.write(&RowRecord::Isc(row))
    }

    fn append_mpr(&mut self, row: MprRow) -> Result<()> {
        self.write(&RowRecord::Mpr(row))
    }
}

/// In-memory sink collecting every row in emission order. Used by the test
/// suite and handy for embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<RowRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSink for MemorySink {
    fn append_fho(&mut self, row: FhoRow) -> Result<()> {
        self.rows.push(RowRecord::Fho(row));
        Ok(())
    }

    fn append_ctc(&mut self, row: CtcRow) -> Result<()> {
        self.rows.push(RowRecord::Ctc(row));
        Ok(())
    }

    fn append_cts(&mut self, row: CtsRow) -> Result<()> {
        self.rows.push(RowRecord::Cts(row));
        Ok(())
    }

    fn append_mctc(&mut self, row: MctcRow) -> Result<()> {
        self.rows.push(RowRecord::Mctc(row));
        Ok(())
    }

    fn append_mcts(&mut self, row: MctsRow) -> Result<()> {
        self.rows.push(RowRecord::Mcts(row));
        Ok(())
    }

    fn append_cnt(&mut self, row: CntRow) -> Result<()> {
        self.rows.push(RowRecord::Cnt(row));
        Ok(())
    }

    fn append_sl1l2(&mut self, row: Sl1l2Row) -> Result<()> {
        self.rows.push(RowRecord::Sl1l2(row));
        Ok(())
    }

    fn append_sal1l2(&mut self, row: Sal1l2Row) -> Result<()> {
        self.rows.push(RowRecord::Sal1l2(row));
        Ok(())
    }

    fn append_vl1l2(&mut self, row: Vl1l2Row) -> Result<()> {
        self.rows.push(RowRecord::Vl1l2(row));
        Ok(())
    }

    fn append_val1l2(&mut self, row: Val1l2Row) -> Result<()> {
        self.rows.push(RowRecord::Val1l2(row));
        Ok(())
    }

    fn append_pct(&mut self, row: PctRow) -> Result<()> {
        self.rows.push(RowRecord::Pct(row));
        Ok(())
    }

    fn append_pstd(&mut self, row: PstdRow) -> Result<()> {
        self.rows.push(RowRecord::Pstd(row));
        Ok(())
    }

    fn append_pjc(&mut self, row: PjcRow) -> Result<()> {
        self.rows.push(RowRecord::Pjc(row));
        Ok(())
    }

    fn append_prc(&mut self, row: PrcRow) -> Result<()> {
        self.rows.push(RowRecord::Prc(row));
        Ok(())
    }

    fn append_nbrctc(&mut self, row: NbrCtcRow) -> Result<()> {
        self.rows.push(RowRecord::NbrCtc(row));
        Ok(())
    }

    fn append_nbrcts(&mut self, row: NbrCtsRow) -> Result<()> {
        self.rows.push(RowRecord::NbrCts(row));
        Ok(())
    }

    fn append_nbrcnt(&mut self, row: NbrCntRow) -> Result<()> {
        self.rows.push(RowRecord::NbrCnt(row));
        Ok(())
    }

    fn append_isc(&mut self, row: IscRow) -> Result<()> {
        self.rows.push(RowRecord::Isc(row));
        Ok(())
    }

    fn append_mpr(&mut self, row: MprRow) -> Result<()> {
        self.rows.push(RowRecord::Mpr(row));
        Ok(())
    }
}
