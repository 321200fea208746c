//! Unit tests for the selection and positioning policies.

use gitbrowser_core::managers::tab_policy::{
    selection_strategy, FollowingTab, PositioningPolicy, PrecedingTab, SelectionStrategy,
};
use gitbrowser_core::types::settings::SelectionPolicy;
use gitbrowser_core::types::tab::{Placement, Tab, TabContent, TabId};
use rstest::rstest;
use std::time::Duration;

fn tabs(ids: &[&str]) -> Vec<Tab> {
    ids.iter()
        .map(|id| Tab::restore(TabId::from(*id), TabContent::Blank, None, 0))
        .collect()
}

fn id(value: &str) -> TabId {
    TabId::from(value)
}

// === Selection after removal ===

#[rstest]
#[case("b", Some("a"))]
#[case("a", Some("b"))]
#[case("c", Some("b"))]
fn preceding_tab_picks_neighbor_of_removed_selection(
    #[case] removed: &str,
    #[case] expected: Option<&str>,
) {
    let collection = tabs(&["a", "b", "c"]);
    let next = PrecedingTab.selection_after_removal(&id(removed), &collection, Some(&id(removed)));
    assert_eq!(next, expected.map(id));
}

#[rstest]
#[case("b", Some("c"))]
#[case("a", Some("b"))]
#[case("c", Some("b"))]
fn following_tab_picks_neighbor_of_removed_selection(
    #[case] removed: &str,
    #[case] expected: Option<&str>,
) {
    let collection = tabs(&["a", "b", "c"]);
    let next = FollowingTab.selection_after_removal(&id(removed), &collection, Some(&id(removed)));
    assert_eq!(next, expected.map(id));
}

#[rstest]
#[case(SelectionPolicy::Preceding)]
#[case(SelectionPolicy::Following)]
fn removing_unselected_tab_keeps_selection(#[case] policy: SelectionPolicy) {
    let strategy = selection_strategy(policy);
    let collection = tabs(&["a", "b", "c"]);
    let next = strategy.selection_after_removal(&id("c"), &collection, Some(&id("a")));
    assert_eq!(next, Some(id("a")));
}

#[rstest]
#[case(SelectionPolicy::Preceding)]
#[case(SelectionPolicy::Following)]
fn removing_only_tab_clears_selection(#[case] policy: SelectionPolicy) {
    let strategy = selection_strategy(policy);
    let collection = tabs(&["a"]);
    assert_eq!(
        strategy.selection_after_removal(&id("a"), &collection, Some(&id("a"))),
        None
    );
}

#[test]
fn no_previous_selection_stays_unselected() {
    let collection = tabs(&["a", "b"]);
    assert_eq!(
        PrecedingTab.selection_after_removal(&id("a"), &collection, None),
        None
    );
}

// === Positioning ===

#[rstest]
#[case(Placement::front(), Some("b"), 0)]
#[case(Placement::back(), Some("b"), 3)]
#[case(Placement::after_selected(), Some("b"), 2)]
#[case(Placement::after_selected(), Some("c"), 3)]
#[case(Placement::after_selected(), None, 3)]
fn placement_insertion_index(
    #[case] placement: Placement,
    #[case] selected: Option<&str>,
    #[case] expected: usize,
) {
    let collection = tabs(&["a", "b", "c"]);
    let selected = selected.map(id);
    let index = placement.insertion_index(&collection, &Tab::blank(), selected.as_ref());
    assert_eq!(index, expected);
}

#[test]
fn placement_delay_ignores_zero() {
    assert_eq!(Placement::back().delayed(Duration::ZERO).delay(), None);
    assert_eq!(
        Placement::back().delayed(Duration::from_millis(20)).delay(),
        Some(Duration::from_millis(20))
    );
}

#[test]
fn placement_selection_flag() {
    assert!(!Placement::back().selects_new_tab());
    assert!(Placement::back().selecting().selects_new_tab());
}
