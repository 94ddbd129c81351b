//! Frames derived from a parent frame.
//!
//! A derived frame copies the parent's directive cache, aliases and
//! computed columns, and adjusts each [`ColumnInfo`] so that the next
//! evaluation only redoes what the transform invalidated. Appending keeps
//! every size; contiguous slicing shifts sizes by the slice offset; any
//! other row selection drops sizes to 0.

use std::collections::{BTreeMap, BTreeSet};

use sf_directive::ColumnInfo;

use crate::error::FrameError;
use crate::frame::StockFrame;

impl StockFrame {
    /// Rows of `self` followed by rows of `other`.
    ///
    /// Input columns missing on either side are padded with NaN. Computed
    /// columns of `self` are padded as well and keep their size, so they
    /// are extended incrementally on the next evaluation.
    pub fn append(&self, other: &Self) -> Result<Self, FrameError> {
        let len = self.len + other.len;
        let mut columns = BTreeMap::new();

        let names: BTreeSet<&str> = self
            .columns
            .keys()
            .filter(|name| self.is_input(name))
            .chain(other.columns.keys().filter(|name| other.is_input(name)))
            .map(String::as_str)
            .collect();

        for name in names {
            let mut values = Vec::with_capacity(len);
            match self.columns.get(name).filter(|_| self.is_input(name)) {
                Some(head) => values.extend_from_slice(head),
                None => values.resize(self.len, f64::NAN),
            }
            match other.columns.get(name).filter(|_| other.is_input(name)) {
                Some(tail) => values.extend_from_slice(tail),
                None => values.resize(len, f64::NAN),
            }
            columns.insert(name.to_owned(), values);
        }

        for key in self.infos.keys() {
            if let Some(head) = self.columns.get(key) {
                let mut values = head.clone();
                values.resize(len, f64::NAN);
                columns.insert(key.clone(), values);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(entries = self.infos.len(), rows = len, "append kept column cache sizes");

        Ok(self.derived(len, columns, self.infos.clone()))
    }

    /// Positional slice with Python-style bounds: negative indexes count
    /// from the end and out of range bounds are clamped.
    ///
    /// A contiguous slice (`step` of `None` or `1`) keeps the cached rows
    /// that survive; a strided one invalidates every computed column.
    pub fn slice(
        &self,
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<usize>,
    ) -> Result<Self, FrameError> {
        let step = step.unwrap_or(1);
        if step == 0 {
            return Err(FrameError::ZeroStep);
        }

        let start = self.bound(start, 0);
        let stop = self.bound(stop, self.len).max(start);
        let rows: Vec<usize> = (start..stop).step_by(step).collect();

        let infos = if step == 1 {
            self.infos
                .iter()
                .map(|(key, info)| {
                    let size = info.size.min(stop).saturating_sub(start);
                    (key.clone(), resized(info, size))
                })
                .collect()
        } else {
            self.invalidated_infos()
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(start, stop, step, rows = rows.len(), "slice adjusted column cache");

        Ok(self.derived(rows.len(), self.take_rows(&rows), infos))
    }

    /// Rows where `mask` is true. Computed columns must be recomputed.
    pub fn filter(&self, mask: &[bool]) -> Result<Self, FrameError> {
        if mask.len() != self.len {
            return Err(FrameError::LengthMismatch {
                name: "mask".to_owned(),
                expected: self.len,
                actual: mask.len(),
            });
        }

        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(row, keep)| keep.then_some(row))
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(rows = rows.len(), "filter invalidated column cache");

        Ok(self.derived(rows.len(), self.take_rows(&rows), self.invalidated_infos()))
    }

    /// All rows except `positions`. Computed columns must be recomputed.
    pub fn drop_rows(&self, positions: &[usize]) -> Result<Self, FrameError> {
        if let Some(&position) = positions.iter().find(|&&p| p >= self.len) {
            return Err(FrameError::RowOutOfBounds {
                position,
                len: self.len,
            });
        }

        let dropped: BTreeSet<usize> = positions.iter().copied().collect();
        let rows: Vec<usize> = (0..self.len).filter(|row| !dropped.contains(row)).collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(dropped = dropped.len(), "drop_rows invalidated column cache");

        Ok(self.derived(rows.len(), self.take_rows(&rows), self.invalidated_infos()))
    }

    /// Removes columns, aliases or computed columns by name.
    ///
    /// Dropping an input column also removes its aliases and every
    /// computed column reading it.
    pub fn drop_columns(&self, names: &[&str]) -> Result<Self, FrameError> {
        let mut frame = self.clone();
        for name in names {
            if frame.aliases.remove(*name).is_some() {
                continue;
            }
            if frame.infos.remove(*name).is_some() {
                frame.columns.remove(*name);
                continue;
            }
            if !frame.columns.contains_key(*name) {
                return Err(FrameError::UnknownColumn((*name).to_owned()));
            }

            let spellings = frame.spellings(name);
            frame.remove_dependents(&spellings);
            frame.aliases.retain(|_, target| target.as_str() != *name);
            frame.columns.remove(*name);
        }

        if frame.columns.is_empty() {
            frame.len = 0;
        }
        Ok(frame)
    }

    fn bound(&self, index: Option<isize>, default: usize) -> usize {
        match index {
            None => default,
            Some(index) if index < 0 => self.len.saturating_sub(index.unsigned_abs()),
            Some(index) => index.unsigned_abs().min(self.len),
        }
    }

    fn take_rows(&self, rows: &[usize]) -> BTreeMap<String, Vec<f64>> {
        self.columns
            .iter()
            .map(|(name, values)| {
                let taken = rows
                    .iter()
                    .map(|&row| values.get(row).copied().unwrap_or(f64::NAN))
                    .collect();
                (name.clone(), taken)
            })
            .collect()
    }

    fn invalidated_infos(&self) -> BTreeMap<String, ColumnInfo> {
        self.infos
            .iter()
            .map(|(key, info)| (key.clone(), resized(info, 0)))
            .collect()
    }

    fn derived(
        &self,
        len: usize,
        columns: BTreeMap<String, Vec<f64>>,
        infos: BTreeMap<String, ColumnInfo>,
    ) -> Self {
        Self {
            len,
            columns,
            infos,
            aliases: self.aliases.clone(),
            directives: self.directives.clone(),
            registry: self.registry.clone(),
        }
    }
}

fn resized(info: &ColumnInfo, size: usize) -> ColumnInfo {
    ColumnInfo {
        size,
        ..info.clone()
    }
}
