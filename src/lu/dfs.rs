// Copyright (C) 2016-2018  ERGO-Code
//
// Depth first search in a graph.

use crate::lu::file::LineFile;

/// Compute the union of `reach(i)` over all `i` in `start` by depth first
/// search.
///
/// Node `j` of the graph has neighbours `graph.indices(j)`.
///
/// On return `xi[top..]` hold the reach in topological order (every node
/// before its neighbours); `top` is the function return value. Nodes that
/// were already marked are excluded from the reach.
///
/// `pstack` is size `m` workspace; its contents are undefined on
/// entry/return. Node `j` is marked iff `marked[j] == marker`. On return
/// nodes `xi[top..]` are marked.
pub(crate) fn reach(
    graph: &LineFile,
    start: &[usize],
    xi: &mut [usize],
    pstack: &mut [usize],
    marked: &mut [u32],
    marker: u32,
) -> usize {
    let mut top = xi.len();
    for &i in start {
        if marked[i] != marker {
            top = dfs(i, graph, top, xi, pstack, marked, marker);
        }
    }
    top
}

// adapted from T. Davis, CSPARSE
fn dfs(
    i: usize,
    graph: &LineFile,
    mut top: usize,
    xi: &mut [usize],
    pstack: &mut [usize],
    marked: &mut [u32],
    marker: u32,
) -> usize {
    let mut head = 0;
    xi[0] = i;
    loop {
        let j = xi[head];
        if marked[j] != marker {
            // node j has not been visited
            marked[j] = marker;
            pstack[head] = graph.begin[j];
        }
        // continue dfs at node j
        let end = graph.end[j];
        let mut p = pstack[head];
        let mut next = None;
        while p < end {
            let k = graph.index[p];
            p += 1;
            if marked[k] != marker {
                next = Some(k);
                break;
            }
        }
        pstack[head] = p;
        match next {
            Some(k) => {
                // start dfs at node k
                head += 1;
                xi[head] = k;
            }
            None => {
                // node j has no unvisited neighbours
                top -= 1;
                xi[top] = j;
                if head == 0 {
                    break;
                }
                head -= 1;
            }
        }
    }
    top
}
