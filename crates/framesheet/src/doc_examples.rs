use crate::{
    AggFunc, Anchor, ColumnRef, DataFrame, Frame, FrameConfig, FrameResult, MemoryHost, Stat,
};
use framesheet_engine::{Selection, label};

/// Lay `rows` of `(key, value)` out at `A1` of a scratch sheet and return the
/// `SUM` formula over the rows belonging to `key`.
///
/// This helper is intended for documentation examples to avoid repetitive setup.
///
/// # Example
///
/// ```rust
/// # use framesheet::doc_examples::grouped_sum;
/// let formula = grouped_sum(&[("a", 1.0), ("a", 2.0), ("b", 3.0), ("a", 4.0)], "a")?;
/// assert_eq!(formula, "=SUM($B$2:$B$3,$B$5)");
/// # Ok::<(), framesheet::FrameError>(())
/// ```
pub fn grouped_sum(rows: &[(&str, f64)], key: &str) -> FrameResult<String> {
    let (mut host, sheet) = MemoryHost::with_sheet("Sheet1");
    let values = rows
        .iter()
        .map(|&(k, v)| vec![k.into(), v.into()])
        .collect();
    let df = DataFrame::from_rows(["key", "value"], values)?;
    let frame = Frame::write(
        &mut host,
        Anchor::new(sheet, 1, 1)?,
        &df,
        FrameConfig::plain(),
    )?;
    let collections = frame.aggregated_range(
        &host,
        &[ColumnRef::name("key")],
        &label(key),
        &[ColumnRef::name("value")],
    )?;
    let selections: Vec<Selection> = collections.into_iter().map(Selection::from).collect();
    frame
        .config()
        .formula_builder()
        .formula(&AggFunc::from(Stat::Sum), &selections)
}
