use super::*;
use yoyaku_watcher::slots::extract_slots;

#[test]
fn test_counts_every_qualifying_cell() {
    let page = SchedulePage::new(&["07/23 (水)", "07/30 (水)", "08/06 (水)"])
        .row(
            "府中試験場",
            "29の国･地域以外の方で、住民票のある方",
            &[Cell::Available, Cell::Full, Cell::Available],
        )
        .row(
            "府中試験場",
            "29の国･地域以外の方で、住民票のある方",
            &[Cell::Empty, Cell::Available, Cell::Empty],
        );

    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 7, 1));

    assert_eq!(slots.len(), 3);
    let dates: Vec<&str> = slots.iter().map(|s| s.date.as_str()).collect();
    assert_eq!(dates, vec!["07/23", "08/06", "07/30"]);
}

#[test]
fn test_past_dates_are_excluded() {
    let page = SchedulePage::new(&["07/30 (水)", "08/06 (水)"]).row(
        "府中試験場",
        "29の国･地域以外の方で、住民票のある方",
        &[Cell::Available, Cell::Available],
    );

    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 7, 31));

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].date, "08/06");
}

#[test]
fn test_same_day_slots_are_included() {
    let page = SchedulePage::new(&["07/30 (水)"]).row(
        "府中試験場",
        "29の国･地域以外の方で、住民票のある方",
        &[Cell::Available],
    );

    // A slot on the current date is still bookable
    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 7, 30));

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].date, "07/30");
}

#[test]
fn test_closed_marker_beats_available_marker() {
    let page = SchedulePage::new(&["07/30 (水)"]).row(
        "府中試験場",
        "29の国･地域以外の方で、住民票のある方",
        &[Cell::AvailableButClosed],
    );

    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 7, 1));
    assert!(slots.is_empty());
}

#[test]
fn test_header_column_mapping() {
    // Header maps cell index 3 to 07/30; the only bookable cell sits at
    // that index
    let page = SchedulePage::new(&["07/23 (水)", "07/30 (水)"]).row(
        "府中試験場",
        "29の国･地域以外の方で、住民票のある方",
        &[Cell::Empty, Cell::Available],
    );

    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 7, 1));

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].date, "07/30");
}

#[test]
fn test_year_rollover_keeps_january_dates() {
    let page = SchedulePage::new(&["12/24 (水)", "01/07 (水)"]).row(
        "府中試験場",
        "29の国･地域以外の方で、住民票のある方",
        &[Cell::Available, Cell::Available],
    );

    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 12, 20));

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[1].date, "01/07");
}

#[test]
fn test_unmapped_columns_are_skipped() {
    // Third data cell has no date column in the header
    let page = SchedulePage::new(&["07/23 (水)", "07/30 (水)"]).row(
        "府中試験場",
        "29の国･地域以外の方で、住民票のある方",
        &[Cell::Full, Cell::Full, Cell::Available],
    );

    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 7, 1));
    assert!(slots.is_empty());
}

#[test]
fn test_non_bookable_icons_do_not_count() {
    let page = SchedulePage::new(&["07/23 (水)", "07/30 (水)", "08/06 (水)"]).row(
        "府中試験場",
        "29の国･地域以外の方で、住民票のある方",
        &[Cell::Full, Cell::OutOfHours, Cell::Empty],
    );

    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 7, 1));
    assert!(slots.is_empty());
}

#[test]
fn test_rows_for_other_targets_are_ignored() {
    let page = SchedulePage::new(&["07/30 (水)"])
        .row("鮫洲試験場", "29の国･地域以外の方で、住民票のある方", &[Cell::Available])
        .row("府中試験場", "29の国･地域の方", &[Cell::Available]);

    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 7, 1));
    assert!(slots.is_empty());
}

#[test]
fn test_slot_carries_target_fields() {
    let page = SchedulePage::new(&["07/30 (水)"]).row(
        "府中試験場",
        "29の国･地域以外の方で、住民票のある方",
        &[Cell::Available],
    );

    let slots = extract_slots(&page.html(), &fuchu_target(), day(2025, 7, 1));

    assert_eq!(slots[0].location, fuchu_target().location);
    assert_eq!(slots[0].category, fuchu_target().category);
    assert!(slots[0].available);
}
