use assert_cmd::Command;
use bookbay_authz::TokenService;

const SECRET: &str = "cli-test-secret";

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("bookbay-cli").unwrap();
    cmd.env("BOOKBAY_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"))
        .env("BOOKBAY_ENV", "local")
        .env("BOOKBAY_AUTH__JWT_SECRET", SECRET);
    cmd
}

#[test]
fn config_redacts_secret() {
    let output = cli().arg("config").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("REDACTED"));
    assert!(!stdout.contains(SECRET));
}

#[test]
fn token_prints_claims() {
    let token = TokenService::new(SECRET)
        .issue("u-42", "ada@example.com", "user")
        .unwrap();

    let output = cli().args(["token", &token]).output().unwrap();
    assert!(output.status.success());

    let claims: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(claims["userId"], "u-42");
    assert_eq!(claims["role"], "user");
}

#[test]
fn garbage_token_fails() {
    let output = cli().args(["token", "not.a.token"]).output().unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Invalid or expired token"));
}
