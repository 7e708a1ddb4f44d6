//! Aggregate formula assembly.
//!
//! Formulas target the host's `AGGREGATE` function so hidden rows and error
//! cells can be skipped; [`HidePolicy::IncludeAll`] falls back to the plain
//! worksheet functions. Spread-over-median has no function number of its own
//! and is written as the quotient of two aggregates.

use std::fmt;
use std::str::FromStr;

use framesheet_common::{AddressStyle, CellRange, FrameError, FrameResult, RangeCollection, SheetRef};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Statistics with a native `AGGREGATE` function number.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stat {
    Count,
    Sum,
    Min,
    Max,
    Mean,
    Median,
    Std,
}

impl Stat {
    pub const ALL: [Stat; 7] = [
        Stat::Count,
        Stat::Sum,
        Stat::Min,
        Stat::Max,
        Stat::Mean,
        Stat::Median,
        Stat::Std,
    ];

    /// `AGGREGATE` function number.
    pub const fn function_num(self) -> u8 {
        match self {
            Stat::Mean => 1,
            Stat::Count => 2,
            Stat::Max => 4,
            Stat::Min => 5,
            Stat::Std => 8,
            Stat::Sum => 9,
            Stat::Median => 12,
        }
    }

    /// Worksheet function used when nothing is excluded.
    pub const fn worksheet_function(self) -> &'static str {
        match self {
            Stat::Count => "COUNT",
            Stat::Sum => "SUM",
            Stat::Min => "MIN",
            Stat::Max => "MAX",
            Stat::Mean => "AVERAGE",
            Stat::Median => "MEDIAN",
            Stat::Std => "STDEV.P",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Stat::Count => "count",
            Stat::Sum => "sum",
            Stat::Min => "min",
            Stat::Max => "max",
            Stat::Mean => "mean",
            Stat::Median => "median",
            Stat::Std => "std",
        }
    }

    pub fn evaluate(self, values: &[f64]) -> Option<f64> {
        let n = values.len();
        match self {
            Stat::Count => Some(n as f64),
            Stat::Sum => Some(values.iter().sum()),
            Stat::Min => values.iter().copied().reduce(f64::min),
            Stat::Max => values.iter().copied().reduce(f64::max),
            Stat::Mean => (n > 0).then(|| values.iter().sum::<f64>() / n as f64),
            Stat::Median => median(values),
            Stat::Std => {
                if n == 0 {
                    return None;
                }
                let mean = values.iter().sum::<f64>() / n as f64;
                let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
                Some((ss / n as f64).sqrt())
            }
        }
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Derived {
    /// Population standard deviation divided by the median.
    SpreadOverMedian,
}

impl Derived {
    pub const fn name(self) -> &'static str {
        match self {
            Derived::SpreadOverMedian => "soa",
        }
    }
}

/// Aggregate to apply to a selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AggFunc {
    Named(Stat),
    Derived(Derived),
    /// Reference the first cell instead of aggregating.
    First,
    /// The function name is read from this cell when the formula evaluates.
    Reference(CellRange),
}

impl AggFunc {
    pub const SOA: AggFunc = AggFunc::Derived(Derived::SpreadOverMedian);

    /// Compute the statistic locally. `Reference` has no fixed meaning.
    pub fn evaluate(&self, values: &[f64]) -> Option<f64> {
        match self {
            AggFunc::Named(stat) => stat.evaluate(values),
            AggFunc::Derived(Derived::SpreadOverMedian) => {
                Some(Stat::Std.evaluate(values)? / Stat::Median.evaluate(values)?)
            }
            AggFunc::First => values.first().copied(),
            AggFunc::Reference(_) => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            AggFunc::Named(stat) => stat.name().to_string(),
            AggFunc::Derived(d) => d.name().to_string(),
            AggFunc::First => "first".to_string(),
            AggFunc::Reference(cell) => cell.to_string(),
        }
    }
}

impl From<Stat> for AggFunc {
    fn from(value: Stat) -> Self {
        AggFunc::Named(value)
    }
}

impl FromStr for AggFunc {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let func = match s.trim().to_ascii_lowercase().as_str() {
            "count" => AggFunc::Named(Stat::Count),
            "sum" => AggFunc::Named(Stat::Sum),
            "min" => AggFunc::Named(Stat::Min),
            "max" => AggFunc::Named(Stat::Max),
            "mean" | "average" => AggFunc::Named(Stat::Mean),
            "median" => AggFunc::Named(Stat::Median),
            "std" => AggFunc::Named(Stat::Std),
            "soa" => AggFunc::SOA,
            "first" => AggFunc::First,
            _ => return Err(FrameError::UnknownFunction(s.to_string())),
        };
        Ok(func)
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Which cells `AGGREGATE` skips.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HidePolicy {
    IncludeAll,
    ExcludeHidden,
    ExcludeErrors,
    #[default]
    ExcludeHiddenAndErrors,
}

impl HidePolicy {
    /// `AGGREGATE` options argument; `None` means use plain functions.
    pub const fn option(self) -> Option<u8> {
        match self {
            HidePolicy::IncludeAll => None,
            HidePolicy::ExcludeHidden => Some(5),
            HidePolicy::ExcludeErrors => Some(6),
            HidePolicy::ExcludeHiddenAndErrors => Some(7),
        }
    }
}

/// A single region or a discontinuous union.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Range(CellRange),
    Collection(RangeCollection),
}

impl Selection {
    pub fn sheet(&self) -> &SheetRef {
        match self {
            Selection::Range(r) => r.sheet(),
            Selection::Collection(c) => c.sheet(),
        }
    }

    pub fn address(&self, style: &AddressStyle) -> String {
        match self {
            Selection::Range(r) => r.address(style),
            Selection::Collection(c) => c.address(style),
        }
    }

    pub fn first_cell(&self) -> CellRange {
        match self {
            Selection::Range(r) => r.first_cell(),
            Selection::Collection(c) => c.first_cell(),
        }
    }
}

impl From<CellRange> for Selection {
    fn from(value: CellRange) -> Self {
        Selection::Range(value)
    }
}

impl From<RangeCollection> for Selection {
    fn from(value: RangeCollection) -> Self {
        Selection::Collection(value)
    }
}

/// Renders aggregate formulas under one policy.
#[derive(Clone, Debug)]
pub struct FormulaBuilder {
    hide_policy: HidePolicy,
    error_wrap: Option<String>,
    style: AddressStyle,
    target: Option<SheetRef>,
}

impl Default for FormulaBuilder {
    fn default() -> Self {
        FormulaBuilder {
            hide_policy: HidePolicy::default(),
            error_wrap: None,
            style: AddressStyle::absolute(),
            target: None,
        }
    }
}

impl FormulaBuilder {
    pub fn new(hide_policy: HidePolicy) -> Self {
        FormulaBuilder {
            hide_policy,
            ..Self::default()
        }
    }

    /// Wrap every formula body in `template`, whose `{}` is the body.
    pub fn with_error_wrap(mut self, template: Option<String>) -> Self {
        self.error_wrap = template;
        self
    }

    pub fn with_style(mut self, style: AddressStyle) -> Self {
        self.style = style.without_formula();
        self
    }

    /// Sheet the formula will live on; references to other sheets are
    /// qualified.
    pub fn writing_to(mut self, sheet: SheetRef) -> Self {
        self.target = Some(sheet);
        self
    }

    pub fn hide_policy(&self) -> HidePolicy {
        self.hide_policy
    }

    fn refer(&self, selection: &Selection) -> String {
        let foreign = self
            .target
            .as_ref()
            .is_some_and(|t| t != selection.sheet());
        let style = if foreign {
            self.style.with_sheetname()
        } else {
            self.style
        };
        selection.address(&style)
    }

    fn refer_cell(&self, cell: &CellRange) -> String {
        self.refer(&Selection::Range(cell.clone()))
    }

    /// Formula body without the leading `=` or any error wrapping.
    pub fn expression(&self, func: &AggFunc, selections: &[Selection]) -> FrameResult<String> {
        let first = selections.first().ok_or(FrameError::EmptySelection)?;
        let refs = || {
            selections
                .iter()
                .map(|s| self.refer(s))
                .collect::<Vec<_>>()
                .join(",")
        };
        let body = match func {
            AggFunc::Named(stat) => match self.hide_policy.option() {
                None => format!("{}({})", stat.worksheet_function(), refs()),
                Some(opt) => format!("AGGREGATE({},{},{})", stat.function_num(), opt, refs()),
            },
            AggFunc::Derived(Derived::SpreadOverMedian) => format!(
                "{}/{}",
                self.expression(&AggFunc::Named(Stat::Std), selections)?,
                self.expression(&AggFunc::Named(Stat::Median), selections)?
            ),
            AggFunc::First => self.refer_cell(&first.first_cell()),
            AggFunc::Reference(cell) => {
                let cell = self.refer_cell(&cell.first_cell());
                let codes: Vec<String> = Stat::ALL
                    .iter()
                    .map(|s| s.function_num().to_string())
                    .collect();
                let names: Vec<String> =
                    Stat::ALL.iter().map(|s| format!("\"{}\"", s.name())).collect();
                format!(
                    "IF({cell}=\"{soa}\",{soa_body},AGGREGATE(INDEX({{{codes}}},MATCH({cell},{{{names}}},0)),{opt},{refs}))",
                    soa = Derived::SpreadOverMedian.name(),
                    soa_body = self.expression(&AggFunc::SOA, selections)?,
                    codes = codes.join(","),
                    names = names.join(","),
                    opt = self.hide_policy.option().unwrap_or(4),
                    refs = refs(),
                )
            }
        };
        Ok(body)
    }

    /// Complete formula: `=` plus the wrapped expression.
    pub fn formula(&self, func: &AggFunc, selections: &[Selection]) -> FrameResult<String> {
        let body = self.expression(func, selections)?;
        Ok(match &self.error_wrap {
            Some(template) => format!("={}", template.replacen("{}", &body, 1)),
            None => format!("={body}"),
        })
    }
}

/// Shorthand for a one-off formula with default options.
pub fn aggregate(func: &AggFunc, selections: &[Selection], hide_policy: HidePolicy) -> FrameResult<String> {
    FormulaBuilder::new(hide_policy).formula(func, selections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(addr: &str) -> Selection {
        CellRange::parse(&SheetRef::new("Data"), addr).unwrap().into()
    }

    #[test]
    fn aggregate_calls_by_policy() {
        let sel = [col("B2:B9")];
        let sum: AggFunc = "sum".parse().unwrap();
        assert_eq!(
            aggregate(&sum, &sel, HidePolicy::default()).unwrap(),
            "=AGGREGATE(9,7,$B$2:$B$9)"
        );
        assert_eq!(
            aggregate(&sum, &sel, HidePolicy::ExcludeHidden).unwrap(),
            "=AGGREGATE(9,5,$B$2:$B$9)"
        );
        assert_eq!(
            aggregate(&"average".parse().unwrap(), &sel, HidePolicy::IncludeAll).unwrap(),
            "=AVERAGE($B$2:$B$9)"
        );
    }

    #[test]
    fn several_selections_are_comma_joined() {
        let data = SheetRef::new("Data");
        let runs = RangeCollection::parse(&data, "C2:C4,C8:C9").unwrap();
        let builder = FormulaBuilder::new(HidePolicy::ExcludeErrors)
            .with_style(AddressStyle::relative());
        assert_eq!(
            builder
                .expression(&Stat::Max.into(), &[runs.into(), col("E2:E3")])
                .unwrap(),
            "AGGREGATE(4,6,C2:C4,C8:C9,E2:E3)"
        );
    }

    #[test]
    fn soa_is_std_over_median() {
        let builder = FormulaBuilder::new(HidePolicy::IncludeAll);
        assert_eq!(
            builder.expression(&AggFunc::SOA, &[col("A1:A20")]).unwrap(),
            "STDEV.P($A$1:$A$20)/MEDIAN($A$1:$A$20)"
        );
        let sample: Vec<f64> = (1..=20).map(f64::from).collect();
        let expected = Stat::Std.evaluate(&sample).unwrap() / 10.5;
        let soa = AggFunc::SOA.evaluate(&sample).unwrap();
        assert!((soa - expected).abs() < 1e-12);
        assert!((Stat::Std.evaluate(&sample).unwrap() - 5.766_281_297_335_398).abs() < 1e-12);
    }

    #[test]
    fn first_references_top_left() {
        let data = SheetRef::new("Data");
        let runs = RangeCollection::parse(&data, "D7:D9,D2:D3").unwrap();
        assert_eq!(
            aggregate(&AggFunc::First, &[runs.into()], HidePolicy::default()).unwrap(),
            "=$D$7"
        );
    }

    #[test]
    fn function_from_cell() {
        let cell = CellRange::parse(&SheetRef::new("Data"), "H1").unwrap();
        let f = FormulaBuilder::new(HidePolicy::default())
            .with_style(AddressStyle::relative())
            .expression(&AggFunc::Reference(cell), &[col("A1:A3")])
            .unwrap();
        assert_eq!(
            f,
            "IF(H1=\"soa\",AGGREGATE(8,7,A1:A3)/AGGREGATE(12,7,A1:A3),\
             AGGREGATE(INDEX({2,9,5,4,1,12,8},MATCH(H1,{\"count\",\"sum\",\"min\",\"max\",\"mean\",\"median\",\"std\"},0)),7,A1:A3))"
        );
    }

    #[test]
    fn wrapping_and_foreign_sheets() {
        let builder = FormulaBuilder::new(HidePolicy::default())
            .with_error_wrap(Some("IFERROR({},\"\")".into()))
            .writing_to(SheetRef::new("Summary"));
        assert_eq!(
            builder.formula(&Stat::Count.into(), &[col("A1:A3")]).unwrap(),
            "=IFERROR(AGGREGATE(2,7,Data!$A$1:$A$3),\"\")"
        );
    }

    #[test]
    fn errors() {
        assert!(matches!(
            "mode".parse::<AggFunc>(),
            Err(FrameError::UnknownFunction(name)) if name == "mode"
        ));
        assert!(matches!(
            aggregate(&Stat::Sum.into(), &[], HidePolicy::default()),
            Err(FrameError::EmptySelection)
        ));
    }

    #[test]
    fn local_statistics() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(Stat::Median.evaluate(&v), Some(2.5));
        assert_eq!(Stat::Min.evaluate(&v), Some(1.0));
        assert_eq!(Stat::Count.evaluate(&v), Some(4.0));
        assert_eq!(Stat::Mean.evaluate(&[]), None);
        assert_eq!(AggFunc::First.evaluate(&v), Some(4.0));
    }
}
