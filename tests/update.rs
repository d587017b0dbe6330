// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

mod common;

use basis_lu::{
    BasisFactorization, FactorConfig, IndexedVector, ReplaceStatus, Status, UpdateMethod,
};
use common::{dominant_column, max_diff, random_vector, DenseBasis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

fn config(method: UpdateMethod) -> FactorConfig {
    FactorConfig {
        update_method: method,
        ..Default::default()
    }
}

fn ftran(bf: &mut BasisFactorization, b: &[f64]) -> Vec<f64> {
    let mut v = IndexedVector::from_dense(b);
    bf.update_column(&mut v).unwrap();
    v.to_dense()
}

fn btran(bf: &mut BasisFactorization, c: &[f64]) -> Vec<f64> {
    let mut v = IndexedVector::from_dense(c);
    bf.update_column_transpose(&mut v).unwrap();
    v.to_dense()
}

/// Replace basis position `k` by `column`, computing the pivot a second time
/// from the BTRAN'd unit row as a simplex code would.
fn replace(
    bf: &mut BasisFactorization,
    basis: &mut DenseBasis,
    k: usize,
    column: Vec<f64>,
) -> ReplaceStatus {
    let m = basis.m;
    let mut row = IndexedVector::unit(m, k);
    bf.update_column_transpose(&mut row).unwrap();
    let pivot_check: f64 = row.values().iter().zip(&column).map(|(y, a)| y * a).sum();

    let mut region = IndexedVector::from_dense(&column);
    match bf.update_column_ft(&mut region) {
        Ok(_) => {}
        Err(Status::StorageExhaustion) => return ReplaceStatus::NoRoom,
        Err(err) => panic!("update_column_ft failed: {err}"),
    }
    let status = bf.replace_column(&region, k, pivot_check, 1e-8).unwrap();
    if status.accepted() {
        basis.columns[k] = column;
    }
    status
}

/// Row holding the dominant entry of the column at position `k`.
fn dominant_row(basis: &DenseBasis, k: usize) -> usize {
    let col = &basis.columns[k];
    (0..basis.m)
        .max_by(|&a, &b| col[a].abs().total_cmp(&col[b].abs()))
        .unwrap()
}

#[rstest]
#[case(UpdateMethod::ForrestTomlin, 1, 20)]
#[case(UpdateMethod::ForrestTomlin, 2, 150)]
#[case(UpdateMethod::ProductForm, 1, 20)]
#[case(UpdateMethod::ProductForm, 2, 150)]
fn updates_match_refactorization(#[case] method: UpdateMethod, #[case] seed: u64, #[case] m: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut basis = DenseBasis::random(&mut rng, m, 3);
    let mut bf = BasisFactorization::new(config(method));
    bf.factor(&basis.matrix(), &basis.sequence()).unwrap();

    let nupdate = 40;
    for _ in 0..nupdate {
        let k = rng.gen_range(0..m);
        let column = dominant_column(&mut rng, m, dominant_row(&basis, k), 3);
        let mut status = replace(&mut bf, &mut basis, k, column.clone());
        if status == ReplaceStatus::NoRoom {
            bf.factor(&basis.matrix(), &basis.sequence()).unwrap();
            status = replace(&mut bf, &mut basis, k, column);
        }
        assert!(status.accepted(), "{:?}", status);

        let x = random_vector(&mut rng, m);
        assert!(max_diff(&ftran(&mut bf, &basis.times(&x)), &x) < 1e-9);
        let y = random_vector(&mut rng, m);
        assert!(max_diff(&btran(&mut bf, &basis.transpose_times(&y)), &y) < 1e-9);
    }
    assert_eq!(bf.lu.nupdate_total(), nupdate);
    if method == UpdateMethod::ForrestTomlin {
        assert_eq!(bf.lu.nforrest_total(), nupdate);
    }
    assert!(bf.lu.pivot_error() < 1e-10);

    let mut fresh = BasisFactorization::new(config(method));
    fresh.factor(&basis.matrix(), &basis.sequence()).unwrap();
    let b = random_vector(&mut rng, m);
    assert!(max_diff(&ftran(&mut bf, &b), &ftran(&mut fresh, &b)) < 1e-9);
    assert!(max_diff(&btran(&mut bf, &b), &btran(&mut fresh, &b)) < 1e-9);
}

#[rstest]
#[case(UpdateMethod::ForrestTomlin)]
#[case(UpdateMethod::ProductForm)]
fn update_limit_asks_for_refactorization(#[case] method: UpdateMethod) {
    let mut rng = StdRng::seed_from_u64(23);
    let m = 12;
    let mut basis = DenseBasis::random(&mut rng, m, 2);
    let mut bf = BasisFactorization::new(FactorConfig {
        maximum_pivots: 3,
        ..config(method)
    });
    bf.factor(&basis.matrix(), &basis.sequence()).unwrap();

    for _ in 0..3 {
        assert!(!bf.wants_refactorization());
        let k = rng.gen_range(0..m);
        let column = dominant_column(&mut rng, m, dominant_row(&basis, k), 2);
        assert!(replace(&mut bf, &mut basis, k, column).accepted());
    }
    assert!(bf.wants_refactorization());
    let mut region = IndexedVector::unit(m, 0);
    assert_eq!(
        bf.update_column_ft(&mut region),
        Err(Status::UpdateLimitReached)
    );

    bf.factor(&basis.matrix(), &basis.sequence()).unwrap();
    assert_eq!(bf.number_pivots(), 0);
    assert_eq!(bf.lu.nupdate_total(), 3);
}

#[test]
fn forrest_tomlin_u_storage_stays_consistent() {
    let mut rng = StdRng::seed_from_u64(29);
    let m = 60;
    let mut basis = DenseBasis::random(&mut rng, m, 5);
    let mut bf = BasisFactorization::new(config(UpdateMethod::ForrestTomlin));
    bf.factor(&basis.matrix(), &basis.sequence()).unwrap();
    let l_nz = bf.lu.l_nz();

    for _ in 0..50 {
        let k = rng.gen_range(0..m);
        let column = dominant_column(&mut rng, m, dominant_row(&basis, k), 5);
        match replace(&mut bf, &mut basis, k, column) {
            status if status.accepted() => {}
            ReplaceStatus::NoRoom => break,
            status => panic!("unexpected {:?}", status),
        }
        assert_eq!(
            bf.number_elements(),
            m + bf.lu.l_nz() + bf.lu.u_nz() + bf.lu.r_nz()
        );
    }
    // L is never touched by updates
    assert_eq!(bf.lu.l_nz(), l_nz);
    assert!(bf.lu.min_pivot() > 0.0);
    assert!(bf.lu.max_pivot() >= bf.lu.min_pivot());
}

#[test]
fn singular_replacement_leaves_factors_alone() {
    let mut rng = StdRng::seed_from_u64(31);
    let m = 15;
    let mut basis = DenseBasis::random(&mut rng, m, 2);
    let mut bf = BasisFactorization::new(FactorConfig::default());
    bf.factor(&basis.matrix(), &basis.sequence()).unwrap();

    // a copy of the column at position 1 cannot replace position 0
    let column = basis.columns[1].clone();
    assert_eq!(
        replace(&mut bf, &mut basis, 0, column),
        ReplaceStatus::Singular
    );
    assert_eq!(bf.number_pivots(), 0);
    let x = random_vector(&mut rng, m);
    assert!(max_diff(&ftran(&mut bf, &basis.times(&x)), &x) < 1e-10);
}

#[test]
fn pivot_check_disagreement_is_rejected() {
    let mut rng = StdRng::seed_from_u64(37);
    let m = 10;
    let basis = DenseBasis::random(&mut rng, m, 2);
    let mut bf = BasisFactorization::new(FactorConfig::default());
    bf.factor(&basis.matrix(), &basis.sequence()).unwrap();

    let column = dominant_column(&mut rng, m, dominant_row(&basis, 4), 2);
    let mut region = IndexedVector::from_dense(&column);
    bf.update_column_ft(&mut region).unwrap();
    let alpha = region.get(4);
    let status = bf.replace_column(&region, 4, alpha * 1.1, 1e-8).unwrap();
    assert_eq!(status, ReplaceStatus::Singular);
    assert_eq!(status.code(), 2);
    assert_eq!(bf.number_pivots(), 0);
}
