/// Input feed tests
///
/// Orders, items and shipments split over separate input files, scanned in
/// several passes, end up in one CSV per order.
/// Run with: cargo test --test input_feed_tests

use collate_orders::{FieldBag, Flusher, InputScanner, OrderStore, OutputWriter};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn ingest_new_files(scanner: &mut InputScanner, store: &OrderStore) -> usize {
    let mut merged = 0;
    for batch in scanner.read_new_batches().unwrap() {
        for element in batch.elements {
            let Ok(bag) = FieldBag::from_json(element) else {
                continue;
            };
            if store.apply(&bag).unwrap().is_merged() {
                merged += 1;
            }
        }
    }
    merged
}

#[test]
fn test_split_files_assemble_into_orders() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let store = Arc::new(OrderStore::new());
    let flusher = Flusher::new(Arc::clone(&store), OutputWriter::new(output.path()));
    let mut scanner = InputScanner::new(input.path());

    fs::write(
        input.path().join("orders.json"),
        r#"{"orders": [
            {"order reference": "A1", "marketplace": "M", "name": "Jo", "surname": "Doe"},
            {"order reference": "B2", "marketplace": "M", "name": "Al", "surname": "Roe"},
            {"order reference": "", "marketplace": "M", "name": "Nobody"}
        ]}"#,
    )
    .unwrap();
    fs::write(
        input.path().join("order_items.json"),
        r#"{"order_items": [
            {"order reference": "A1", "marketplace": "M", "order item number": 1, "sku": "S1", "price per unit": 9.5, "quantity": 2},
            {"order reference": "A1", "marketplace": "M", "order item number": 2, "sku": "S2", "price per unit": "1.5", "quantity": "4"},
            {"order reference": "B2", "marketplace": "M", "order item number": 1, "sku": "S3", "price per unit": 3}
        ]}"#,
    )
    .unwrap();

    assert_eq!(ingest_new_files(&mut scanner, &store), 5);
    assert_eq!(flusher.flush_once().unwrap().orders_written, 0);

    fs::write(
        input.path().join("order_shipments.json"),
        r#"{"order_shipments": [
            {"order reference": "A1", "marketplace": "M", "postal service": "P1", "postcode": "Z1"},
            {"order reference": "B2", "marketplace": "M", "postal service": "P2", "postcode": "Z2"}
        ]}"#,
    )
    .unwrap();
    assert_eq!(ingest_new_files(&mut scanner, &store), 2);

    let report = flusher.flush_once().unwrap();
    assert_eq!(report.orders_written, 1);
    assert_eq!(report.items_flushed, 2);

    let text = fs::read_to_string(output.path().join("M-A1.csv")).unwrap();
    assert!(text.contains("A1,M,Jo,Doe,1,S1,9.5,2,P1,Z1\nA1,M,Jo,Doe,2,S2,1.5,4,P1,Z1\n\n"));
    assert!(!output.path().join("M-B2.csv").exists(), "B2 item has no quantity yet");

    fs::write(
        input.path().join("late_items.json"),
        r#"{"order_items": [{"order reference": "B2", "marketplace": "M", "order item number": 1, "quantity": 1}]}"#,
    )
    .unwrap();
    assert_eq!(ingest_new_files(&mut scanner, &store), 1);
    assert_eq!(flusher.flush_once().unwrap().items_flushed, 1);

    let text = fs::read_to_string(output.path().join("M-B2.csv")).unwrap();
    assert!(text.contains("B2,M,Al,Roe,1,S3,3,1,P2,Z2\n"));
    assert_eq!(ingest_new_files(&mut scanner, &store), 0, "files are only read once");
}
