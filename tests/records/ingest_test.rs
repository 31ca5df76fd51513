//! Report import: column mapping, defaults, filtering and margin.

use std::io::Write;

use dunning::records::ingest::{apply_margin, import_csv, parse_csv, IngestError, IngestOptions};

const STAMP: i64 = 1_700_000_000_000;

fn options() -> IngestOptions {
    IngestOptions {
        margin_rate: 0.05,
        batch_stamp: STAMP,
    }
}

const HEADER: &str = "codigo,nome,cpf,telefone,parcelas,atraso,loja,vendedor,total";

#[test]
fn maps_fixed_columns() {
    let csv = format!("{HEADER}\n101,MARIA SILVA - LOJA 2,000,(71) 99999-0000,3,45,1,X,100\n");

    let records = match parse_csv(&csv, options()) {
        Ok(records) => records,
        Err(err) => panic!("report should parse: {err}"),
    };

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, format!("CL-0-{STAMP}"));
    assert_eq!(record.name, "MARIA SILVA");
    assert_eq!(record.phone, "71999990000");
    assert_eq!(record.installments_pending, 3);
    assert_eq!(record.days_late, 45);
    assert!((record.original_total - 100.0).abs() < f64::EPSILON);
    assert!((record.total_due - 105.0).abs() < f64::EPSILON);
}

#[test]
fn semicolon_reports_with_decimal_commas_are_detected() {
    let csv = "codigo;nome;cpf;telefone;parcelas;atraso;loja;vendedor;total\n\
               1;JOAO SOUZA;0;71988887777;2;10;1;X;1.234,56\n";

    let records = parse_csv(csv, options()).unwrap_or_default();

    assert_eq!(records.len(), 1);
    assert!((records[0].original_total - 1234.56).abs() < 1e-9);
    assert!((records[0].total_due - 1297.0).abs() < f64::EPSILON);
}

#[test]
fn rows_without_positive_total_are_dropped_but_keep_index_in_ids() {
    let csv = format!(
        "{HEADER}\n\
         1,ZERADO,0,71,1,1,1,X,0\n\
         2,NEGATIVO,0,71,1,1,1,X,-50\n\
         3,SEM TOTAL,0,71,1,1,1,X,\n\
         4,ANA LIMA,0,71,1,1,1,X,20\n"
    );

    let records = parse_csv(&csv, options()).unwrap_or_default();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "ANA LIMA");
    assert_eq!(records[0].id, format!("CL-3-{STAMP}"));
    assert!(records.iter().all(|r| r.is_billable()));
}

#[test]
fn missing_cells_fall_back_to_defaults() {
    let csv = format!("{HEADER}\n1,,0,,,,1,X,10\n");

    let records = parse_csv(&csv, options()).unwrap_or_default();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Cliente Sem Nome");
    assert_eq!(records[0].phone, "");
    assert_eq!(records[0].installments_pending, 1);
    assert_eq!(records[0].days_late, 0);
}

#[test]
fn zero_or_unreadable_installments_become_one() {
    let csv = format!(
        "{HEADER}\n\
         1,A,0,71,0,abc,1,X,10\n\
         2,B,0,71,duas,5,1,X,10\n"
    );

    let records = parse_csv(&csv, options()).unwrap_or_default();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].installments_pending, 1);
    assert_eq!(records[0].days_late, 0);
    assert_eq!(records[1].installments_pending, 1);
    assert_eq!(records[1].days_late, 5);
}

#[test]
fn short_rows_are_tolerated() {
    let csv = format!("{HEADER}\n1,CURTA\n2,COMPLETA,0,71,1,1,1,X,30\n");

    let records = parse_csv(&csv, options()).unwrap_or_default();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "COMPLETA");
}

#[test]
fn header_only_report_is_empty() {
    let records = parse_csv(&format!("{HEADER}\n"), options()).unwrap_or_default();
    assert!(records.is_empty());
}

#[test]
fn margin_rounds_up_to_whole_units() {
    assert!((apply_margin(100.0, 0.05) - 105.0).abs() < f64::EPSILON);
    assert!((apply_margin(99.9, 0.05) - 105.0).abs() < f64::EPSILON);
    assert!((apply_margin(10.0, 0.05) - 11.0).abs() < f64::EPSILON);
    assert!((apply_margin(20.0, 0.0) - 20.0).abs() < f64::EPSILON);
}

#[test]
fn import_reads_file_from_disk() {
    let mut file = match tempfile::NamedTempFile::new() {
        Ok(file) => file,
        Err(err) => panic!("temp file should be created: {err}"),
    };
    let written = writeln!(file, "{HEADER}\n1,MARIA,0,71999990000,2,30,1,X,200");
    assert!(written.is_ok());

    let records = match import_csv(file.path(), options()) {
        Ok(records) => records,
        Err(err) => panic!("import should succeed: {err}"),
    };

    assert_eq!(records.len(), 1);
    assert!((records[0].total_due - 210.0).abs() < f64::EPSILON);
}

#[test]
fn import_of_missing_file_is_io_error() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("temp dir should be created: {err}"),
    };
    let missing = dir.path().join("relatorio.csv");

    match import_csv(&missing, options()) {
        Err(IngestError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected io error, got: {other:?}"),
    }
}
