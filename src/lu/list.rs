// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln
//
// Doubly linked lists (see [1] section 5.5)
//
// Maintain `nelem` elements in `nlist` doubly linked lists. Each element
// belongs to zero or one list at a time.
//
// In `flink` and `blink` the leading `nelem` entries store links, the trailing
// `nlist` entries store heads. For 0 <= i < nelem and 0 <= j < nlist:
//
//     flink[i]        next element in the list containing element i
//     blink[i]        previous element in the list containing element i
//     flink[nelem+j]  first element in list j
//     blink[nelem+j]  last element in list j
//
// The forward link of the last element in a list points to its head. For
// empty lists the heads point to themselves. When an element is not in any
// list its links point to itself.
//
// `min_list` >= 1 is maintained such that lists 1..min_list-1 are empty.
// List 0 is not covered by `min_list`.
//
//    [1] Istvan Maros, Computational Techniques of the Simplex Method

#[derive(Debug, Clone, Default)]
pub(crate) struct CountLists {
    nelem: usize,
    flink: Vec<usize>,
    blink: Vec<usize>,
    pub(crate) min_list: usize,
}

impl CountLists {
    /// `nelem` elements in `nlist` lists, all empty.
    #[cfg(test)]
    pub(crate) fn new(nelem: usize, nlist: usize) -> Self {
        let mut lists = Self::default();
        lists.init(nelem, nlist);
        lists
    }

    /// Reset to `nelem` elements in `nlist` empty lists.
    pub(crate) fn init(&mut self, nelem: usize, nlist: usize) {
        self.nelem = nelem;
        self.flink.clear();
        self.blink.clear();
        self.flink.extend(0..nelem + nlist);
        self.blink.extend(0..nelem + nlist);
        self.min_list = usize::max(1, nlist);
    }

    /// Append `elem` to `list`. `elem` must not be in any list already.
    pub(crate) fn add(&mut self, elem: usize, list: usize) {
        let flink = &mut self.flink;
        let blink = &mut self.blink;
        let head = self.nelem + list;
        debug_assert_eq!(flink[elem], elem);
        debug_assert_eq!(blink[elem], elem);
        let last = blink[head];
        blink[head] = elem;
        blink[elem] = last;
        flink[last] = elem;
        flink[elem] = head;
        if list > 0 && list < self.min_list {
            self.min_list = list;
        }
    }

    /// Remove `elem` from its list. No-op if it is in no list.
    pub(crate) fn remove(&mut self, elem: usize) {
        let flink = &mut self.flink;
        let blink = &mut self.blink;
        flink[blink[elem]] = flink[elem];
        blink[flink[elem]] = blink[elem];
        flink[elem] = elem;
        blink[elem] = elem;
    }

    /// Remove `elem` from its list (if any) and append it to `list`.
    pub(crate) fn move_to(&mut self, elem: usize, list: usize) {
        self.remove(elem);
        self.add(elem, list);
    }

    /// First element of `list`, or `None` if the list is empty.
    pub(crate) fn first(&self, list: usize) -> Option<usize> {
        self.element(self.flink[self.nelem + list])
    }

    /// Last element of `list`, or `None` if the list is empty.
    pub(crate) fn last(&self, list: usize) -> Option<usize> {
        self.element(self.blink[self.nelem + list])
    }

    /// Element after `elem` in its list.
    pub(crate) fn next(&self, elem: usize) -> Option<usize> {
        self.element(self.flink[elem])
    }

    /// Element before `elem` in its list.
    pub(crate) fn prev(&self, elem: usize) -> Option<usize> {
        self.element(self.blink[elem])
    }

    /// Elements of `list` from first to last.
    pub(crate) fn iter(&self, list: usize) -> Walk<'_> {
        Walk {
            lists: self,
            next: self.first(list),
            forward: true,
        }
    }

    /// Elements of `list` from last to first.
    pub(crate) fn iter_rev(&self, list: usize) -> Walk<'_> {
        Walk {
            lists: self,
            next: self.last(list),
            forward: false,
        }
    }

    fn element(&self, link: usize) -> Option<usize> {
        if link < self.nelem {
            Some(link)
        } else {
            None
        }
    }
}

/// Iterator over the elements of one list.
pub(crate) struct Walk<'a> {
    lists: &'a CountLists,
    next: Option<usize>,
    forward: bool,
}

impl Iterator for Walk<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let elem = self.next?;
        self.next = if self.forward {
            self.lists.next(elem)
        } else {
            self.lists.prev(elem)
        };
        Some(elem)
    }
}
