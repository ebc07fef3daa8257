//! Lot table controller tests over the real HTTP client.

mod common;

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::FakeBackend;
use lotadmin::api::ApiClient;
use lotadmin::lots::LotTable;
use lotadmin::query::{LotFilters, LotQuery};

fn table(backend: &FakeBackend, query: LotQuery) -> LotTable<ApiClient> {
    LotTable::new(backend.client(), query).with_sleeper(no_sleep)
}

fn no_sleep(_: Duration) {}

fn assert_selection_on_page(table: &LotTable<ApiClient>) {
    for id in table.selection() {
        assert!(
            table.lots().iter().any(|l| l.id == *id),
            "selected id {id} is not on the loaded page"
        );
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[test]
fn middle_page_has_previous_and_next() {
    let backend = FakeBackend::start(120);
    let mut table = table(&backend, LotQuery::new(50).with_page(2));
    table.refresh().unwrap();

    let pager = table.pager();
    assert_eq!(pager.current_page, 2);
    assert_eq!(pager.total_pages, 3);
    assert!(pager.has_previous());
    assert!(pager.has_next());
    assert_eq!(table.lots().len(), 50);
}

#[test]
fn next_page_stops_at_the_last_page() {
    let backend = FakeBackend::start(120);
    let mut table = table(&backend, LotQuery::new(50).with_page(2));
    table.refresh().unwrap();

    table.next_page().unwrap();
    assert_eq!(table.pager().current_page, 3);
    assert!(!table.pager().has_next());
    assert_eq!(table.lots().len(), 20);

    table.next_page().unwrap();
    assert_eq!(table.pager().current_page, 3);

    table.go_to_page(1).unwrap();
    table.previous_page().unwrap();
    assert_eq!(table.pager().current_page, 1);
    assert!(!table.pager().has_previous());
}

#[test]
fn page_past_the_end_falls_back_to_last_page() {
    let backend = FakeBackend::start(60);
    let mut table = table(&backend, LotQuery::new(50).with_page(9));
    table.refresh().unwrap();
    assert_eq!(table.pager().current_page, 2);
    assert_eq!(table.query().page, 2);
    assert_eq!(table.lots().len(), 10);
}

#[test]
fn empty_result_shows_page_one() {
    let backend = FakeBackend::start(0);
    let mut table = table(&backend, LotQuery::default());
    table.refresh().unwrap();
    assert_eq!(table.total(), 0);
    assert_eq!(table.pager().current_page, 1);
    assert_eq!(table.pager().last_page(), 1);
    assert!(!table.pager().has_next());
}

#[test]
fn applying_filters_resets_to_first_page() {
    let backend = FakeBackend::start(120);
    let mut table = table(&backend, LotQuery::new(5).with_page(3));
    table.refresh().unwrap();
    table.toggle_select(table.lots()[0].id);

    table
        .apply_filters(LotFilters {
            lot_number: Some("LOT-01".to_string()),
            ..LotFilters::default()
        })
        .unwrap();

    assert_eq!(table.query().page, 1);
    assert_eq!(table.total(), 10);
    assert_eq!(table.pager().total_pages, 2);
    assert_selection_on_page(&table);
}

#[test]
fn inverted_date_range_is_rejected_without_a_request() {
    let backend = FakeBackend::start(10);
    let mut table = table(&backend, LotQuery::default());
    table.refresh().unwrap();
    let before = backend.request_count();

    let err = table
        .apply_filters(LotFilters {
            date_from: chrono::NaiveDate::from_ymd_opt(2025, 3, 10),
            date_to: chrono::NaiveDate::from_ymd_opt(2025, 3, 1),
            ..LotFilters::default()
        })
        .unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert_eq!(backend.request_count(), before);
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[test]
fn selection_stays_within_loaded_page_across_navigation() {
    let backend = FakeBackend::start(30);
    let mut table = table(&backend, LotQuery::new(10));
    table.refresh().unwrap();
    table.select_all();
    assert_eq!(table.selection().len(), 10);

    table.next_page().unwrap();
    assert!(table.selection().is_empty());
    assert_selection_on_page(&table);

    table.toggle_select(table.lots()[3].id);
    table.toggle_select(9999);
    assert_eq!(table.selection().len(), 1);
    assert_selection_on_page(&table);
}

// ---------------------------------------------------------------------------
// Bulk delete
// ---------------------------------------------------------------------------

#[test]
fn bulk_delete_with_one_missing_lot_reports_one_failure() {
    let backend = FakeBackend::start(5);
    let mut table = table(&backend, LotQuery::default());
    table.refresh().unwrap();
    for id in [1, 2, 3] {
        table.toggle_select(id);
    }

    // Someone else removes lot 2 in the meantime.
    backend.state.lock().unwrap().lots.retain(|l| l.id != 2);

    let report = table.delete_selected();
    assert_eq!(report.succeeded, [1, 3]);
    assert_eq!(report.failed_ids(), [2]);
    assert!(report.failed[0].1.is_not_found());
    assert_eq!(report.summary(), "2 succeeded, 1 failed");

    // The refetch drops lot 2 too: the backend no longer has it.
    let listed: Vec<i64> = table.lots().iter().map(|l| l.id).collect();
    assert_eq!(listed, [5, 4]);
    assert!(table.selection().is_empty());
    assert_eq!(table.total(), 2);
    assert_eq!(backend.lot_ids(), [4, 5]);
    assert_selection_on_page(&table);
}

#[test]
fn bulk_delete_refills_the_page_from_the_backend() {
    let backend = FakeBackend::start(120);
    let mut table = table(&backend, LotQuery::new(50));
    table.refresh().unwrap();
    let ids: Vec<i64> = table.lots()[..3].iter().map(|l| l.id).collect();
    for id in ids {
        table.toggle_select(id);
    }

    let report = table.delete_selected();
    assert!(report.is_complete());
    assert_eq!(table.lots().len(), 50);
    assert_eq!(table.total(), 117);
    assert_eq!(table.pager().total_pages, 3);
    assert!(table.selection().is_empty());
}

#[test]
fn deleting_the_last_row_of_the_last_page_falls_back_a_page() {
    let backend = FakeBackend::start(51);
    let mut table = table(&backend, LotQuery::new(50).with_page(2));
    table.refresh().unwrap();
    let only = table.lots()[0].id;

    table.delete_one(only).unwrap();
    assert_eq!(table.pager().current_page, 1);
    assert_eq!(table.pager().total_pages, 1);
    assert_eq!(table.lots().len(), 50);
}

#[test]
fn list_page_returns_filtered_rows_and_backend_total() {
    let backend = FakeBackend::start(120);
    let mut table = table(&backend, LotQuery::new(5));
    table
        .apply_filters(LotFilters {
            lot_number: Some("LOT-01".to_string()),
            ..LotFilters::default()
        })
        .unwrap();

    let (lots, total) = table.list_page().unwrap();
    assert_eq!(total, 10);
    assert_eq!(lots.len(), 5);
    assert!(lots.iter().all(|l| l.lot_number.starts_with("LOT-01")));
}

#[test]
fn delete_one_missing_lot_leaves_table_untouched() {
    let backend = FakeBackend::start(3);
    let mut table = table(&backend, LotQuery::default());
    table.refresh().unwrap();
    let err = table.delete_one(77).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(table.lots().len(), 3);
    assert_eq!(table.total(), 3);
}

// ---------------------------------------------------------------------------
// Downloads
// ---------------------------------------------------------------------------

static SLEEPS: AtomicUsize = AtomicUsize::new(0);
static SLEPT_FOR: Mutex<Vec<Duration>> = Mutex::new(Vec::new());

fn counting_sleep(d: Duration) {
    SLEEPS.fetch_add(1, Ordering::SeqCst);
    SLEPT_FOR.lock().unwrap().push(d);
}

#[test]
fn bulk_download_pauses_between_items_only() {
    let backend = FakeBackend::start(4);
    let dir = tempfile::tempdir().unwrap();
    let table = LotTable::new(backend.client(), LotQuery::default())
        .with_bulk_delay(Duration::from_millis(250))
        .with_sleeper(counting_sleep);

    let (report, saved) = table.download_many(&[1, 2, 3], dir.path());
    assert!(report.is_complete());
    assert_eq!(saved.len(), 3);
    assert_eq!(SLEEPS.load(Ordering::SeqCst), 2);
    assert!(
        SLEPT_FOR
            .lock()
            .unwrap()
            .iter()
            .all(|d| *d == Duration::from_millis(250))
    );

    let names: Vec<String> = saved
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["LOT-001.csv", "LOT-002 export.csv", "lot_3.csv"]);
}

#[test]
fn download_selected_prunes_lots_gone_from_the_backend() {
    let backend = FakeBackend::start(4);
    let dir = tempfile::tempdir().unwrap();
    let mut table = table(&backend, LotQuery::default());
    table.refresh().unwrap();
    table.toggle_select(1);
    table.toggle_select(4);
    backend.state.lock().unwrap().lots.retain(|l| l.id != 4);

    let (report, saved) = table.download_selected(dir.path());
    assert_eq!(report.succeeded, [1]);
    assert_eq!(report.failed_ids(), [4]);
    assert!(report.failed[0].1.is_not_found());
    assert_eq!(saved.len(), 1);

    // The partial failure keeps the selection, minus the lot that is gone.
    assert_eq!(table.selection(), [1]);
    assert!(table.lots().iter().all(|l| l.id != 4));
    assert_eq!(table.total(), 3);
    assert_selection_on_page(&table);
}

#[test]
fn download_selected_clears_selection_on_full_success() {
    let backend = FakeBackend::start(4);
    let dir = tempfile::tempdir().unwrap();
    let mut table = table(&backend, LotQuery::default());
    table.refresh().unwrap();
    table.toggle_select(2);
    table.toggle_select(3);

    let (report, _) = table.download_selected(dir.path());
    assert!(report.is_complete());
    assert!(table.selection().is_empty());
}

#[test]
fn repeated_download_does_not_overwrite() {
    let backend = FakeBackend::start(1);
    let dir = tempfile::tempdir().unwrap();
    let table = table(&backend, LotQuery::default());

    let first = table.download_one(1, dir.path()).unwrap();
    let second = table.download_one(1, dir.path()).unwrap();
    assert_ne!(first, second);
    assert_eq!(second.file_name().unwrap(), "LOT-001 (1).csv");
}
