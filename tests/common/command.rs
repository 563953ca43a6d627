use assert_cmd::Command;
use std::path::Path;

pub fn run_bit_rewrite_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("bit-rewrite").expect("Failed to find bit-rewrite binary");
    cmd.env("RUST_LOG", "off");
    cmd.env("NO_COLOR", "1");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}
