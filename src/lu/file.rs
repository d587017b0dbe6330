// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::list::CountLists;
use crate::Status;

// Data file implementation
//
// A data file stores lines of (index,value) pairs. Entries of each line are
// contiguous in memory. Lines can be in any order in memory and there can be
// gaps between consecutive lines.
//
//     index, value    storing (index,value) pairs
//     begin[k]        pointer to first element in line 0 <= k < nlines,
//     end[k]          pointer to one past the last element in line k.
//     begin[nlines]   pointer to the first element of unused space
//     end[nlines]     holds the capacity
//
// `order` holds the lines in a doubly linked list in the order in which they
// appear in memory. A line that cannot grow in place is reappended at the end
// of the used space; when the end is full the file is compressed.
#[derive(Debug, Clone, Default)]
pub(crate) struct LineFile {
    nlines: usize,
    pub(crate) begin: Vec<usize>,
    pub(crate) end: Vec<usize>,
    order: CountLists,
    pub(crate) index: Vec<usize>,
    pub(crate) value: Vec<f64>,

    /// extra room per moved line: `pad + stretch * nz`
    pad: usize,
    stretch: f64,

    /// number of lines moved to the file end
    pub(crate) nexpand: usize,
    /// number of compressions
    pub(crate) ngarbage: usize,
}

impl LineFile {
    /// Empty file of `nlines` lines with `capacity` slots.
    pub(crate) fn new(nlines: usize, capacity: usize, pad: usize, stretch: f64) -> Self {
        let mut file = Self {
            pad,
            stretch,
            ..Default::default()
        };
        file.reset(nlines, capacity);
        file
    }

    /// Make the file empty, keeping (or growing) the allocation.
    pub(crate) fn reset(&mut self, nlines: usize, capacity: usize) {
        self.nlines = nlines;
        self.begin.clear();
        self.begin.resize(nlines + 1, 0);
        self.end.clear();
        self.end.resize(nlines + 1, 0);
        self.end[nlines] = capacity;
        self.order.init(nlines, 1);
        for line in 0..nlines {
            self.order.add(line, 0);
        }
        self.index.resize(capacity, 0);
        self.value.resize(capacity, 0.0);
        self.nexpand = 0;
        self.ngarbage = 0;
    }

    pub(crate) fn capacity(&self) -> usize {
        self.end[self.nlines]
    }

    /// First slot of the unused space at the file end.
    pub(crate) fn used(&self) -> usize {
        self.begin[self.nlines]
    }

    pub(crate) fn len(&self, line: usize) -> usize {
        self.end[line] - self.begin[line]
    }

    pub(crate) fn indices(&self, line: usize) -> &[usize] {
        &self.index[self.begin[line]..self.end[line]]
    }

    pub(crate) fn line(&self, line: usize) -> (&[usize], &[f64]) {
        let range = self.begin[line]..self.end[line];
        (&self.index[range.clone()], &self.value[range])
    }

    /// Number of live entries over all lines.
    pub(crate) fn live_nz(&self) -> usize {
        (0..self.nlines).map(|line| self.len(line)).sum()
    }

    /// Position of `i` in `line`.
    pub(crate) fn find(&self, line: usize, i: usize) -> Option<usize> {
        (self.begin[line]..self.end[line]).find(|&pos| self.index[pos] == i)
    }

    /// Append an entry. Room must have been made by [`LineFile::get_space`].
    pub(crate) fn push(&mut self, line: usize, i: usize, x: f64) {
        let pos = self.end[line];
        debug_assert!(pos < self.room_limit(line));
        self.index[pos] = i;
        self.value[pos] = x;
        self.end[line] = pos + 1;
    }

    /// Remove the entry at `pos` by moving the last entry of `line` into it.
    pub(crate) fn remove_at(&mut self, line: usize, pos: usize) {
        debug_assert!(pos >= self.begin[line] && pos < self.end[line]);
        let last = self.end[line] - 1;
        self.index[pos] = self.index[last];
        self.value[pos] = self.value[last];
        self.end[line] = last;
    }

    /// Remove index `i` from `line`. Returns its value.
    pub(crate) fn remove(&mut self, line: usize, i: usize) -> Option<f64> {
        let pos = self.find(line, i)?;
        let x = self.value[pos];
        self.remove_at(line, pos);
        Some(x)
    }

    pub(crate) fn clear_line(&mut self, line: usize) {
        self.end[line] = self.begin[line];
    }

    /// One past the last slot `line` may use without moving.
    fn room_limit(&self, line: usize) -> usize {
        match self.order.next(line) {
            Some(next) => self.begin[next],
            None => self.end[self.nlines],
        }
    }

    /// Make room for `extra` more entries at the end of `line`. Moves the line
    /// to the file end and compresses the file if needed. Returns `false` if
    /// the capacity is insufficient even after compression.
    pub(crate) fn get_space(&mut self, line: usize, extra: usize) -> bool {
        if self.end[line] + extra <= self.room_limit(line) {
            if self.order.next(line).is_none() {
                let used = &mut self.begin[self.nlines];
                *used = usize::max(*used, self.end[line] + extra);
            }
            return true;
        }
        let nz = self.len(line);
        let need = nz + extra;
        if self.end[self.nlines] - self.used() < need {
            self.cleanup();
            if self.end[self.nlines] - self.used() < need {
                return false;
            }
        }
        let want = extra + self.pad + (self.stretch * (nz + extra) as f64) as usize;
        let room = self.end[self.nlines] - self.used() - nz;
        self.reappend(line, usize::min(want, room));
        true
    }

    /// Like [`LineFile::get_space`], but grows the file until the request
    /// fits. Used while factorizing, where storage is not bounded.
    pub(crate) fn get_space_iterate(&mut self, line: usize, extra: usize) -> Result<(), Status> {
        while !self.get_space(line, extra) {
            let need = self.len(line) + extra + self.pad;
            let capacity = self.capacity();
            self.grow(capacity + usize::max(need, capacity / 2))?;
        }
        Ok(())
    }

    /// Grow the capacity to `capacity` slots.
    pub(crate) fn grow(&mut self, capacity: usize) -> Result<(), Status> {
        let current = self.capacity();
        if capacity <= current {
            return Ok(());
        }
        let additional = capacity - self.index.len();
        self.index
            .try_reserve_exact(additional)
            .map_err(|_| Status::OutOfMemory)?;
        self.value
            .try_reserve_exact(additional)
            .map_err(|_| Status::OutOfMemory)?;
        self.index.resize(capacity, 0);
        self.value.resize(capacity, 0.0);
        self.end[self.nlines] = capacity;
        Ok(())
    }

    // Reappend line to file end and add `extra_space` elements room. The file
    // must have at least len(line) + `extra_space` elements free space.
    fn reappend(&mut self, line: usize, extra_space: usize) {
        let mut used = self.used();
        let ibeg = self.begin[line];
        let iend = self.end[line];
        debug_assert!(used + (iend - ibeg) + extra_space <= self.capacity());
        self.begin[line] = used;
        for pos in ibeg..iend {
            self.index[used] = self.index[pos];
            self.value[used] = self.value[pos];
            used += 1;
        }
        self.end[line] = used;
        self.begin[self.nlines] = used + extra_space;
        self.order.move_to(line, 0);
        self.nexpand += 1;
    }

    /// Compress the file to reuse memory gaps. The ordering of lines in memory
    /// and of entries within each line is unchanged. To each line with `nz`
    /// entries `stretch*nz+pad` elements extra space are added; the extra
    /// space is chopped if it would overlap the following line.
    ///
    /// Returns the number of entries in the file.
    pub(crate) fn cleanup(&mut self) -> usize {
        let mut nz = 0;
        let mut used = 0;
        let mut extra_space = 0;
        let mut next = self.order.first(0);
        while let Some(i) = next {
            let ibeg = self.begin[i];
            let iend = self.end[i];
            debug_assert!(ibeg >= used);
            used = usize::min(used + extra_space, ibeg);
            self.begin[i] = used;
            for pos in ibeg..iend {
                self.index[used] = self.index[pos];
                self.value[used] = self.value[pos];
                used += 1;
            }
            self.end[i] = used;
            extra_space = (self.stretch * (iend - ibeg) as f64) as usize + self.pad;
            nz += iend - ibeg;
            next = self.order.next(i);
        }
        debug_assert!(used <= self.used());
        self.begin[self.nlines] = usize::min(used + extra_space, self.used());
        self.ngarbage += 1;
        nz
    }

    /// Count entries of this file that are missing (or differ in value) in
    /// `transpose`, which stores the same matrix with lines and indices
    /// swapped.
    #[cfg(any(test, feature = "debug"))]
    pub(crate) fn diff(&self, transpose: &LineFile, compare_values: bool) -> usize {
        let mut ndiff = 0;
        for line in 0..self.nlines {
            for pos in self.begin[line]..self.end[line] {
                let other = self.index[pos];
                match transpose.find(other, line) {
                    None => ndiff += 1,
                    Some(where_) => {
                        if compare_values && transpose.value[where_] != self.value[pos] {
                            ndiff += 1;
                        }
                    }
                }
            }
        }
        ndiff
    }

    /// Lines in memory order.
    #[cfg(test)]
    pub(crate) fn memory_order(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut next = self.order.first(0);
        while let Some(i) = next {
            out.push(i);
            next = self.order.next(i);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contiguous_and_ordered(file: &LineFile) -> bool {
        let mut last_end = 0;
        for line in file.memory_order() {
            if file.begin[line] < last_end || file.end[line] < file.begin[line] {
                return false;
            }
            last_end = file.end[line];
        }
        last_end <= file.used()
    }

    #[test]
    fn lines_move_to_end_when_full() {
        let mut file = LineFile::new(3, 32, 0, 0.0);
        assert!(file.get_space(0, 2));
        file.push(0, 7, 1.0);
        file.push(0, 8, 2.0);
        assert!(file.get_space(1, 1));
        file.push(1, 4, 3.0);
        // line 0 is boxed in by line 1 and must move
        assert!(file.get_space(0, 1));
        file.push(0, 9, 4.0);
        assert_eq!(file.line(0), (&[7, 8, 9][..], &[1.0, 2.0, 4.0][..]));
        assert_eq!(file.memory_order().last(), Some(&0));
        assert_eq!(file.live_nz(), 4);
        assert!(contiguous_and_ordered(&file));
    }

    #[test]
    fn cleanup_coalesces_gaps_and_keeps_order() {
        let mut file = LineFile::new(4, 24, 0, 0.0);
        for line in 0..4 {
            assert!(file.get_space(line, 3));
            for k in 0..3 {
                file.push(line, 10 * line + k, (10 * line + k) as f64);
            }
        }
        file.remove(1, 11);
        file.clear_line(2);
        let before: Vec<Vec<usize>> = (0..4).map(|l| file.indices(l).to_vec()).collect();
        let nz = file.cleanup();
        assert_eq!(nz, file.live_nz());
        assert_eq!(nz, 8);
        assert_eq!(file.used(), 8);
        for line in 0..4 {
            assert_eq!(file.indices(line), before[line].as_slice());
        }
        assert!(contiguous_and_ordered(&file));
    }

    #[test]
    fn get_space_fails_without_capacity_and_iterate_grows() {
        let mut file = LineFile::new(2, 4, 0, 0.0);
        assert!(file.get_space(0, 4));
        for k in 0..4 {
            file.push(0, k, 1.0);
        }
        assert!(!file.get_space(1, 1));
        file.get_space_iterate(1, 3).unwrap();
        file.push(1, 0, 5.0);
        assert!(file.capacity() >= 7);
        assert_eq!(file.live_nz(), 5);
        assert!(contiguous_and_ordered(&file));
    }

    #[test]
    fn diff_detects_missing_transpose_entries() {
        let mut cols = LineFile::new(2, 8, 0, 0.0);
        let mut rows = LineFile::new(2, 8, 0, 0.0);
        cols.get_space(0, 2);
        cols.push(0, 1, 2.0);
        rows.get_space(1, 1);
        rows.push(1, 0, 2.0);
        assert_eq!(cols.diff(&rows, true), 0);
        assert_eq!(rows.diff(&cols, true), 0);
        cols.push(0, 0, 1.0);
        assert_eq!(cols.diff(&rows, false), 1);
    }
}
