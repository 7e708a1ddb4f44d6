//! Pivoted tables laid out as heat maps with a colour-scale legend.

use framesheet_common::{CellRange, CellValue, FrameError, FrameResult};
use framesheet_host::SheetHost;

use crate::config::FrameConfig;
use crate::formula::Stat;
use crate::frame::{Anchor, Frame};
use crate::table::DataFrame;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extrema {
    pub min: f64,
    pub max: f64,
}

impl Extrema {
    pub fn new(a: f64, b: f64) -> Self {
        Extrema {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// `None` for an empty sample.
    pub fn of(values: &[f64]) -> Option<Self> {
        Some(Extrema {
            min: Stat::Min.evaluate(values)?,
            max: Stat::Max.evaluate(values)?,
        })
    }

    /// `steps` evenly spaced values from `min` to `max`, both included.
    pub fn interpolate(&self, steps: u32) -> Vec<f64> {
        match steps {
            0 => Vec::new(),
            1 => vec![self.min],
            n => (0..n)
                .map(|i| self.min + (self.max - self.min) * f64::from(i) / f64::from(n - 1))
                .collect(),
        }
    }
}

/// Where everything ended up after [`Heatmap::write`].
#[derive(Clone, Debug)]
pub struct HeatmapLayout {
    pub frame: Frame,
    pub data: CellRange,
    /// Absent when the configured legend length is zero.
    pub legend: Option<CellRange>,
    pub extrema: Extrema,
    pub row_extrema: Vec<Option<Extrema>>,
    pub column_extrema: Vec<Option<Extrema>>,
}

pub struct Heatmap<'a> {
    table: &'a DataFrame,
    config: FrameConfig,
    extrema: Option<Extrema>,
}

impl<'a> Heatmap<'a> {
    pub fn new(table: &'a DataFrame, config: FrameConfig) -> Self {
        Heatmap {
            table,
            config,
            extrema: None,
        }
    }

    /// Scale the colours and the legend to fixed bounds instead of the data.
    pub fn with_extrema(mut self, extrema: Extrema) -> Self {
        self.extrema = Some(extrema);
        self
    }

    pub fn write<H: SheetHost>(self, host: &mut H, anchor: Anchor) -> FrameResult<HeatmapLayout> {
        if self.table.height() == 0 {
            return Err(FrameError::EmptyFrame);
        }
        let numbers = self.table.numbers();
        let row_extrema: Vec<Option<Extrema>> = numbers
            .iter()
            .map(|row| Extrema::of(&row.iter().flatten().copied().collect::<Vec<_>>()))
            .collect();
        let column_extrema: Vec<Option<Extrema>> = (0..self.table.width())
            .map(|c| {
                let column: Vec<f64> = numbers.iter().filter_map(|row| row[c]).collect();
                Extrema::of(&column)
            })
            .collect();
        let all: Vec<f64> = numbers.iter().flatten().flatten().copied().collect();
        let extrema = match self.extrema {
            Some(fixed) => fixed,
            None => Extrema::of(&all).ok_or(FrameError::EmptySelection)?,
        };

        let config = FrameConfig {
            merge_headers: true,
            ..self.config
        };
        let frame = Frame::write(host, anchor, self.table, config)?;
        let data = frame.data_range(host)?;
        let scale = frame.config().color_scale;
        host.apply_color_scale(&data, &scale)
            .map_err(FrameError::host)?;

        let length = frame.config().legend_length;
        let legend = if length > 0 {
            let col = data.col_end() + frame.config().legend_gap + 1;
            let strip = CellRange::new(
                data.sheet().clone(),
                data.row(),
                col,
                data.row() + length - 1,
                col,
            )?;
            let values: Vec<Vec<CellValue>> = extrema
                .interpolate(length)
                .into_iter()
                .map(|v| vec![CellValue::from(v)])
                .collect();
            host.set_range_values(&strip, &values)
                .map_err(FrameError::host)?;
            host.apply_color_scale(&strip, &scale)
                .map_err(FrameError::host)?;
            Some(strip)
        } else {
            None
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            data = %data,
            min = extrema.min,
            max = extrema.max,
            legend = ?legend.as_ref().map(ToString::to_string),
            "heat map written"
        );
        Ok(HeatmapLayout {
            frame,
            data,
            legend,
            extrema,
            row_extrema,
            column_extrema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend_values_are_linear() {
        let e = Extrema::new(10.0, 0.0);
        assert_eq!(e.interpolate(5), vec![0.0, 2.5, 5.0, 7.5, 10.0]);
        assert_eq!(e.interpolate(1), vec![0.0]);
        assert!(e.interpolate(0).is_empty());
    }

    #[test]
    fn extrema_of_sample() {
        assert_eq!(Extrema::of(&[3.0, -1.0, 7.0]), Some(Extrema::new(-1.0, 7.0)));
        assert_eq!(Extrema::of(&[]), None);
    }
}
