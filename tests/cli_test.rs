use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::Path;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

// The fixture pair pangram.txt / pangram.txt.z was produced by the original
// C implementation of pack, so these tests pin the wire format against the
// real tool, not against ourselves.

#[test]
fn pack_file_matches_reference() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("pangram.txt");
    std::fs::copy(Path::new("tests").join("pangram.txt"),&in_path)?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg(&in_path).assert().success();
    let packed = std::fs::read(temp_dir.path().join("pangram.txt.z"))?;
    let reference = std::fs::read(Path::new("tests").join("pangram.txt.z"))?;
    assert_eq!(packed,reference);
    // the original is retired once the packed file is in place
    assert!(!in_path.exists());
    Ok(())
}

#[test]
fn expand_to_stdout_matches_reference() -> STDRESULT {
    let mut cmd = Command::cargo_bin("oldpack")?;
    let output = cmd.arg("-d").arg("-c")
        .arg(Path::new("tests").join("pangram.txt.z"))
        .output()?;
    assert!(output.status.success());
    let reference = std::fs::read(Path::new("tests").join("pangram.txt"))?;
    assert_eq!(output.stdout,reference);
    Ok(())
}

#[test]
fn expand_raw_stream_from_stdin() -> STDRESULT {
    let packed = std::fs::read(Path::new("tests").join("pangram.txt.z"))?;
    let mut cmd = assert_cmd::Command::cargo_bin("oldpack")?;
    let output = cmd.arg("-d").write_stdin(packed).output()?;
    assert!(output.status.success());
    let reference = std::fs::read(Path::new("tests").join("pangram.txt"))?;
    assert_eq!(output.stdout,reference);
    Ok(())
}

#[test]
fn stdout_round_trip() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let text = "I am Sam. Sam I am. I do not like this Sam I am.\n";
    let in_path = temp_dir.path().join("sam.txt");
    std::fs::write(&in_path,text)?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    let output = cmd.arg("-c").arg("-s").arg(&in_path).output()?;
    assert!(output.status.success());
    let z_path = temp_dir.path().join("sam.txt.z");
    std::fs::write(&z_path,&output.stdout)?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    let output = cmd.arg("-d").arg("-c").arg(&z_path).output()?;
    assert!(output.status.success());
    assert_eq!(output.stdout,text.as_bytes());
    Ok(())
}

#[test]
fn trivial_file_skipped_without_error() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("same.txt");
    std::fs::write(&in_path,"aaaaaaaa")?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg(&in_path).assert()
        .success()
        .stderr(predicate::str::contains("trivial file"));
    assert!(in_path.exists());
    assert!(!temp_dir.path().join("same.txt.z").exists());
    Ok(())
}

#[test]
fn no_savings_skipped_unless_forced() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("tiny.txt");
    std::fs::write(&in_path,"abababab")?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg(&in_path).assert()
        .success()
        .stderr(predicate::str::contains("no blocks saved"));
    assert!(in_path.exists());
    assert!(!temp_dir.path().join("tiny.txt.z").exists());
    // -s keeps the packed file no matter how large
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg("-s").arg(&in_path).assert().success();
    assert!(temp_dir.path().join("tiny.txt.z").exists());
    assert!(!in_path.exists());
    Ok(())
}

#[test]
fn unpack_file_in_place() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let z_path = temp_dir.path().join("pangram.txt.z");
    std::fs::copy(Path::new("tests").join("pangram.txt.z"),&z_path)?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg("-d").arg(&z_path).assert().success();
    let expanded = std::fs::read(temp_dir.path().join("pangram.txt"))?;
    let reference = std::fs::read(Path::new("tests").join("pangram.txt"))?;
    assert_eq!(expanded,reference);
    // the packed file is retired once the original is back in place
    assert!(!z_path.exists());
    Ok(())
}

#[test]
fn unpack_appends_suffix_to_bare_name() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let z_path = temp_dir.path().join("pangram.txt.z");
    std::fs::copy(Path::new("tests").join("pangram.txt.z"),&z_path)?;
    // naming the result finds the input by appending the suffix
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg("-d").arg(temp_dir.path().join("pangram.txt")).assert().success();
    let expanded = std::fs::read(temp_dir.path().join("pangram.txt"))?;
    let reference = std::fs::read(Path::new("tests").join("pangram.txt"))?;
    assert_eq!(expanded,reference);
    assert!(!z_path.exists());
    Ok(())
}

#[test]
fn unpack_refuses_overwrite() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let z_path = temp_dir.path().join("pangram.txt.z");
    let out_path = temp_dir.path().join("pangram.txt");
    std::fs::copy(Path::new("tests").join("pangram.txt.z"),&z_path)?;
    std::fs::write(&out_path,"do not clobber me")?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg("-d").arg(&z_path).assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(std::fs::read(&out_path)?,b"do not clobber me");
    assert!(z_path.exists());
    Ok(())
}

#[test]
fn unpack_skips_unpacked_file() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let z_path = temp_dir.path().join("plain.z");
    std::fs::write(&z_path,"just text, no signature")?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg("-d").arg(&z_path).assert()
        .code(1)
        .stderr(predicate::str::contains("signature not found"));
    assert!(z_path.exists());
    assert!(!temp_dir.path().join("plain").exists());
    Ok(())
}

#[test]
fn unpack_cleans_up_on_truncation() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let z_path = temp_dir.path().join("pangram.txt.z");
    let packed = std::fs::read(Path::new("tests").join("pangram.txt.z"))?;
    std::fs::write(&z_path,&packed[..packed.len()-1])?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg("-d").arg(&z_path).assert().code(4);
    // the partial output is removed, the packed file kept
    assert!(!temp_dir.path().join("pangram.txt").exists());
    assert!(z_path.exists());
    Ok(())
}

#[test]
fn stats_match_historic_layout() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("abc.txt");
    std::fs::write(&in_path,"AAAABBBCC")?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg("-c").arg("-s").arg("-i").arg(&in_path).assert()
        .success()
        .stderr(predicate::str::contains("         4      44% <101> = <A>  0\n"))
        .stderr(predicate::str::contains("Packed size: 20 bytes"));
    Ok(())
}

#[test]
fn bad_magic_reported_per_file() -> STDRESULT {
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg("-d").arg("-c").arg(Path::new("tests").join("pangram.txt")).assert()
        .code(1)
        .stderr(predicate::str::contains("signature not found"));
    Ok(())
}

#[test]
fn existing_output_is_not_overwritten() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("pangram.txt");
    let z_path = temp_dir.path().join("pangram.txt.z");
    std::fs::copy(Path::new("tests").join("pangram.txt"),&in_path)?;
    std::fs::write(&z_path,"do not clobber me")?;
    let mut cmd = Command::cargo_bin("oldpack")?;
    cmd.arg(&in_path).assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(std::fs::read(&z_path)?,b"do not clobber me");
    assert!(in_path.exists());
    Ok(())
}
