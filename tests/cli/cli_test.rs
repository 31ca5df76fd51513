//! CLI contract tests.

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;

use assert_cmd::Command;

const REPORT: &str = "codigo,nome,cpf,telefone,parcelas,atraso,loja,vendedor,total\n\
                      1,MARIA SILVA - LOJA 2,0,(71) 99999-0000,3,45,1,X,100\n\
                      2,SEM DIVIDA,0,71988887777,1,1,1,X,0\n";

struct Sandbox {
    home: tempfile::TempDir,
    report: PathBuf,
}

fn sandbox() -> Sandbox {
    let home = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("temp dir should be created: {err}"),
    };
    let report = home.path().join("relatorio.csv");
    assert!(fs::write(&report, REPORT).is_ok());
    Sandbox { home, report }
}

fn dunning(home: &Path) -> Command {
    let mut cmd = match Command::cargo_bin("dunning") {
        Ok(cmd) => cmd,
        Err(err) => panic!("binary should build: {err}"),
    };
    cmd.env("HOME", home)
        .env_remove("GEMINI_API_KEY")
        .env("RUST_LOG", "warn");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = match cmd.output() {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn import_lists_billable_customers() {
    let sb = sandbox();

    let stdout = stdout_of(dunning(sb.home.path()).arg("import").arg(&sb.report));

    assert!(stdout.contains("1 inadimplentes"));
    assert!(stdout.contains("MARIA SILVA"));
    assert!(stdout.contains("105,00"));
    assert!(!stdout.contains("SEM DIVIDA"));
}

#[test]
fn import_json_emits_records() {
    let sb = sandbox();

    let stdout = stdout_of(
        dunning(sb.home.path())
            .arg("import")
            .arg(&sb.report)
            .arg("--json"),
    );

    let records: serde_json::Value = match serde_json::from_str(&stdout) {
        Ok(value) => value,
        Err(err) => panic!("stdout should be JSON: {err}\n{stdout}"),
    };
    assert_eq!(records[0]["name"], "MARIA SILVA");
    assert_eq!(records[0]["phone"], "71999990000");
    assert_eq!(records[0]["installments_pending"], 3);
}

#[test]
fn prompt_renders_selected_tone() {
    let sb = sandbox();

    let stdout = stdout_of(
        dunning(sb.home.path())
            .arg("prompt")
            .arg(&sb.report)
            .args(["--tone", "urgent"]),
    );

    assert!(stdout.contains("TOM URGENTE"));
    assert!(stdout.contains("R$ 105,00"));
}

#[test]
fn prompt_applies_operator_edit_by_row_index() {
    let sb = sandbox();

    let stdout = stdout_of(
        dunning(sb.home.path())
            .arg("prompt")
            .arg(&sb.report)
            .args(["--edit", "0=MARIA S. SANTOS - LOJA 1;150,50"]),
    );

    assert!(stdout.contains("Nome do Cliente: MARIA S. SANTOS\n"), "{stdout}");
    assert!(stdout.contains("R$ 150,50"));
    assert!(!stdout.contains("R$ 105,00"));
}

#[test]
fn import_json_reflects_edit() {
    let sb = sandbox();

    let stdout = stdout_of(
        dunning(sb.home.path())
            .arg("import")
            .arg(&sb.report)
            .arg("--json")
            .args(["--edit", "0=MARIA SANTOS;abc"]),
    );

    let records: serde_json::Value = match serde_json::from_str(&stdout) {
        Ok(value) => value,
        Err(err) => panic!("stdout should be JSON: {err}\n{stdout}"),
    };
    assert_eq!(records[0]["name"], "MARIA SANTOS");
    assert_eq!(records[0]["total_due"], 0.0);
}

#[test]
fn edit_with_unknown_key_fails() {
    let sb = sandbox();

    let output = match dunning(sb.home.path())
        .arg("prompt")
        .arg(&sb.report)
        .args(["--edit", "9=NINGUEM;10"])
        .output()
    {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no record matches edit key"), "{stderr}");
}

#[test]
fn malformed_edit_is_a_usage_error() {
    let sb = sandbox();

    let output = match dunning(sb.home.path())
        .arg("prompt")
        .arg(&sb.report)
        .args(["--edit", "MARIA;10"])
        .output()
    {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("KEY=NAME;AMOUNT"), "{stderr}");
}

#[test]
fn generate_without_api_key_fails_with_guidance() {
    let sb = sandbox();

    let output = match dunning(sb.home.path())
        .arg("generate")
        .arg(&sb.report)
        .output()
    {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing Gemini API key"), "{stderr}");
}

#[test]
fn missing_report_fails() {
    let sb = sandbox();

    let output = match dunning(sb.home.path())
        .arg("import")
        .arg(sb.home.path().join("nope.csv"))
        .output()
    {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };

    assert!(!output.status.success());
}

/// Answer one Gemini request with a canned candidate.
fn fake_gemini(text: &str) -> String {
    let listener = match TcpListener::bind("127.0.0.1:0") {
        Ok(listener) => listener,
        Err(err) => panic!("listener should bind: {err}"),
    };
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => panic!("listener should expose local addr: {err}"),
    };
    let body = serde_json::json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    })
    .to_string();

    thread::spawn(move || {
        if let Ok((mut socket, _)) = listener.accept() {
            let mut raw = Vec::new();
            let mut buf = [0_u8; 4096];
            while let Ok(n) = socket.read(&mut buf) {
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .filter_map(|l| l.split_once(':'))
                        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                        .unwrap_or_default();
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes());
        }
    });

    format!("http://{addr}/v1beta")
}

#[test]
fn generate_drafts_message_and_whatsapp_link() {
    let sb = sandbox();
    let base_url = fake_gemini("Olá Maria! Valor: R$ 105,00 via PIX.");
    let config = sb.home.path().join("config.toml");
    let written = fs::write(
        &config,
        format!("[gemini]\nbase_url = \"{base_url}\"\ntimeout_secs = 10\n\n[retry]\njitter_ms = 0\n"),
    );
    assert!(written.is_ok());

    let stdout = stdout_of(
        dunning(sb.home.path())
            .env("GEMINI_API_KEY", "test-key")
            .arg("--config")
            .arg(&config)
            .arg("generate")
            .arg(&sb.report)
            .arg("--json"),
    );

    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    // generating event, done event, final result
    assert_eq!(lines.len(), 3, "{stdout}");
    assert_eq!(lines[0]["status"], "generating");
    assert_eq!(lines[1]["status"], "done");
    let result = &lines[2];
    assert_eq!(result["customer_name"], "MARIA SILVA");
    assert_eq!(result["message"], "Olá Maria! Valor: R$ 105,00 via PIX.");
    let link = result["whatsapp"].as_str().unwrap_or_default();
    assert!(link.starts_with("https://wa.me/71999990000?text=Ol%C3%A1%20Maria!"));
}
