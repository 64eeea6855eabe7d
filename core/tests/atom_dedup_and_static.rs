//! End-to-end: case-insensitive dedup, removal once every reference is
//! dropped, and survival past that point once marked static.

use gcore::atom::AtomTable;

#[test]
fn dedup_then_removal_then_survival_once_static() {
    let table = AtomTable::global();

    let a = table.find_or_create("Alpha-integration-probe");
    let b = table.find_or_create("alpha-integration-probe");
    assert_eq!(a.hash(), b.hash());
    assert!(a.eq_ignore_case(b.as_str()));
    drop(a);
    drop(b);
    assert!(
        table.find("alpha-integration-probe").is_none(),
        "dropping every external reference must remove the atom from both indexes"
    );

    let kept = table.find_or_create("Beta-integration-probe");
    table.mark_static(&kept);
    drop(kept);
    assert!(
        table.find("beta-integration-probe").is_some(),
        "a statically-marked atom must survive its external refcount reaching zero"
    );
}
