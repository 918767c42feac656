mod support;

use menulens::ingest::aggregate::aggregate_sources;
use rust_decimal::Decimal;
use support::testkit::{PosRow, pos_export, temp_workspace, write_bytes, write_file};

#[test]
fn exports_with_banner_lines_are_parsed_and_tagged_with_their_source() {
    let workspace = temp_workspace("menulens-ingest");
    assert!(workspace.is_ok());
    if let Ok(workspace) = workspace {
        let body = pos_export(
            &[
                PosRow::new("101", "05 Jan 2025 12:30:00", &["Veg Thali", "Chapati"], "130.00"),
                PosRow::new("102", "2025-01-05 13:10:00", &["Soda"], "₹ 1,070"),
            ],
            true,
        );
        let path = write_file(workspace.path(), "january.csv", &body);

        let aggregated = aggregate_sources(&[path]);
        assert!(aggregated.is_ok());
        if let Ok(aggregated) = aggregated {
            assert_eq!(aggregated.orders.len(), 2);
            assert_eq!(aggregated.reports.len(), 1);

            let first = &aggregated.orders[0];
            assert_eq!(first.order_id, "january.csv#101");
            assert_eq!(first.items, vec!["Veg Thali".to_string(), "Chapati".to_string()]);
            assert_eq!(first.service_zone.as_deref(), Some("Dine In"));
            assert_eq!(first.table_number.as_deref(), Some("4"));
            assert_eq!(first.formatted_datetime(), "2025-01-05 12:30:00");

            assert_eq!(aggregated.orders[1].order_total, Decimal::from(1070));

            let report = &aggregated.reports[0];
            assert_eq!(report.encoding, "utf8");
            assert_eq!(report.rows_read, 2);
            assert_eq!(report.rows_skipped, 0);
        }
    }
}

#[test]
fn bad_rows_are_skipped_and_counted_not_fatal() {
    let workspace = temp_workspace("menulens-ingest");
    assert!(workspace.is_ok());
    if let Ok(workspace) = workspace {
        let body = pos_export(
            &[
                PosRow::new("1", "2025-01-05 12:00:00", &["Veg Thali"], "110"),
                PosRow::new("2", "not a date", &["Veg Thali"], "110"),
                PosRow::new("3", "2025-01-05 12:05:00", &["Veg Thali"], "0"),
                PosRow::new("4", "2025-01-05 12:06:00", &[], "50"),
                PosRow::new("1", "2025-01-05 12:07:00", &["Chapati"], "20"),
                PosRow::new("5", "2025-01-05 12:08:00", &["Chapati"], "20.555"),
            ],
            false,
        );
        let path = write_file(workspace.path(), "orders.csv", &body);

        let aggregated = aggregate_sources(&[path]);
        assert!(aggregated.is_ok());
        if let Ok(aggregated) = aggregated {
            assert_eq!(aggregated.orders.len(), 1);
            let report = &aggregated.reports[0];
            assert_eq!(report.rows_read, 6);
            assert_eq!(report.rows_parsed, 1);
            assert_eq!(report.rows_skipped, 5);

            let codes = report
                .issues
                .iter()
                .map(|issue| issue.code.as_str())
                .collect::<Vec<&str>>();
            assert_eq!(
                codes,
                vec![
                    "invalid_timestamp",
                    "non_positive_total",
                    "missing_items",
                    "duplicate_order_id",
                    "invalid_amount_scale",
                ]
            );
        }
    }
}

#[test]
fn latin1_exports_are_decoded_and_reported() {
    let workspace = temp_workspace("menulens-ingest");
    assert!(workspace.is_ok());
    if let Ok(workspace) = workspace {
        let mut body = b"Order No.,Created,Items,My Amount (Rs.)\n".to_vec();
        body.extend_from_slice(b"7,2025-03-01 09:00:00,\"Caf\xe9 Latte, Croissant\",180\n");
        let path = write_bytes(workspace.path(), "legacy.csv", &body);

        let aggregated = aggregate_sources(&[path]);
        assert!(aggregated.is_ok());
        if let Ok(aggregated) = aggregated {
            assert_eq!(aggregated.reports[0].encoding, "latin1");
            assert_eq!(aggregated.orders.len(), 1);
            assert_eq!(aggregated.orders[0].items[0], "Café Latte");
            assert_eq!(aggregated.orders[0].items[1], "Croissant");
        }
    }
}

#[test]
fn multiple_exports_keep_input_order() {
    let workspace = temp_workspace("menulens-ingest");
    assert!(workspace.is_ok());
    if let Ok(workspace) = workspace {
        let february = write_file(
            workspace.path(),
            "february.csv",
            &pos_export(
                &[PosRow::new("9", "2025-02-01 12:00:00", &["Soda"], "70")],
                false,
            ),
        );
        let january = write_file(
            workspace.path(),
            "january.csv",
            &pos_export(
                &[
                    PosRow::new("9", "2025-01-01 12:00:00", &["Veg Thali"], "110"),
                    PosRow::new("10", "2025-01-02 12:00:00", &["Chapati"], "20"),
                ],
                false,
            ),
        );

        let aggregated = aggregate_sources(&[february, january]);
        assert!(aggregated.is_ok());
        if let Ok(aggregated) = aggregated {
            let ids = aggregated
                .orders
                .iter()
                .map(|order| order.order_id.as_str())
                .collect::<Vec<&str>>();
            assert_eq!(ids, vec!["february.csv#9", "january.csv#9", "january.csv#10"]);
            assert_eq!(aggregated.reports[0].source_file, "february.csv");
        }
    }
}

#[test]
fn same_named_exports_in_different_folders_are_kept_apart() {
    let workspace = temp_workspace("menulens-ingest");
    assert!(workspace.is_ok());
    if let Ok(workspace) = workspace {
        let january = write_file(
            workspace.path(),
            "jan/export.csv",
            &pos_export(&[PosRow::new("1", "2025-01-01 12:00:00", &["Soda"], "70")], false),
        );
        let february = write_file(
            workspace.path(),
            "feb/export.csv",
            &pos_export(&[PosRow::new("1", "2025-02-01 12:00:00", &["Soda"], "70")], false),
        );

        let aggregated = aggregate_sources(&[january.clone(), february.clone()]);
        assert!(aggregated.is_ok());
        if let Ok(aggregated) = aggregated {
            assert_eq!(aggregated.orders.len(), 2);
            assert_ne!(aggregated.orders[0].order_id, aggregated.orders[1].order_id);
            assert_eq!(
                aggregated.orders[1].order_id,
                format!("{}#1", february.display())
            );
            for report in &aggregated.reports {
                assert_eq!(report.rows_parsed, 1);
                assert_eq!(report.rows_skipped, 0);
                assert!(report.issues.is_empty());
            }
            assert_eq!(aggregated.reports[0].source_file, january.display().to_string());
        }
    }
}

#[test]
fn file_level_problems_fail_the_whole_run() {
    let workspace = temp_workspace("menulens-ingest");
    assert!(workspace.is_ok());
    if let Ok(workspace) = workspace {
        let none = aggregate_sources(&[]);
        assert!(matches!(none, Err(error) if error.code == "no_sources"));

        let path = write_file(
            workspace.path(),
            "orders.csv",
            &pos_export(&[PosRow::new("1", "2025-01-01 12:00:00", &["Soda"], "70")], false),
        );
        let twice = aggregate_sources(&[path.clone(), path]);
        assert!(matches!(twice, Err(error) if error.code == "duplicate_source"));

        let missing_column = write_file(
            workspace.path(),
            "no_total.csv",
            "Order No.,Created,Items\n1,2025-01-01 12:00:00,Soda\n",
        );
        let schema = aggregate_sources(&[missing_column]);
        assert!(matches!(schema, Err(error) if error.code == "source_schema_mismatch"));

        let blank = write_file(workspace.path(), "blank.csv", "\n\n");
        let empty = aggregate_sources(&[blank]);
        assert!(matches!(empty, Err(error) if error.code == "source_empty"));

        let absent = aggregate_sources(&[workspace.path().join("absent.csv")]);
        assert!(matches!(absent, Err(error) if error.code == "source_unreadable"));
    }
}
