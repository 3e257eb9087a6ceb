use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const SAM: &str = "I am Sam. Sam I am. I do not like this Sam I am.\r\n";

// Write a test file in the temporary directory
fn make_input(temp_dir: &tempfile::TempDir,name: &str,dat: &[u8]) -> Result<PathBuf,Box<dyn std::error::Error>> {
    let path = temp_dir.path().join(name);
    std::fs::write(&path,dat)?;
    Ok(path)
}

fn round_trip_test(dat: &[u8]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_input(&temp_dir,"sam.txt",dat)?;
    let cmp_path = temp_dir.path().join("sam.lzw");
    let out_path = temp_dir.path().join("sam_out.txt");
    Command::cargo_bin("lzw14")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&cmp_path)
        .assert()
        .success();
    Command::cargo_bin("lzw14")?
        .arg("decompress")
        .arg("-i").arg(&cmp_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();
    match (std::fs::read(in_path),std::fs::read(out_path)) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with reference")
    }
    Ok(())
}

#[test]
fn round_trip() -> STDRESULT {
    round_trip_test(SAM.repeat(100).as_bytes())?;
    round_trip_test("ABABABA".as_bytes())
}

#[test]
fn round_trip_empty() -> STDRESULT {
    round_trip_test(&[])
}

#[test]
fn reports_sizes() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_input(&temp_dir,"sam.txt",SAM.repeat(20).as_bytes())?;
    let cmp_path = temp_dir.path().join("sam.lzw");
    let assert = Command::cargo_bin("lzw14")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&cmp_path)
        .assert()
        .success();
    let in_len = std::fs::metadata(&in_path)?.len();
    let out_len = std::fs::metadata(&cmp_path)?.len();
    assert.stderr(predicate::str::contains(format!("compressed {} into {}",in_len,out_len)));
    Ok(())
}

#[test]
fn default_output_names() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_input(&temp_dir,"notes.txt",SAM.as_bytes())?;
    Command::cargo_bin("lzw14")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .assert()
        .success();
    let cmp_path = temp_dir.path().join("notes_compressed.txt");
    assert!(cmp_path.exists());
    Command::cargo_bin("lzw14")?
        .arg("decompress")
        .arg("-i").arg(&cmp_path)
        .assert()
        .success();
    let out_path = temp_dir.path().join("notes_compressed_decompressed.txt");
    assert_eq!(std::fs::read(out_path)?,SAM.as_bytes());
    Ok(())
}

#[test]
fn truncated_stream_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let mut compressed = lzw14::lzw::compress_slice(SAM.as_bytes(),&lzw14::STD_OPTIONS)?;
    compressed.pop();
    let in_path = make_input(&temp_dir,"sam.lzw",&compressed)?;
    let out_path = temp_dir.path().join("sam.txt");
    Command::cargo_bin("lzw14")?
        .arg("decompress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("TrailerMismatch"));
    assert!(!out_path.exists());
    Ok(())
}

#[test]
fn declined_overwrite() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_input(&temp_dir,"sam.txt",SAM.as_bytes())?;
    let out_path = make_input(&temp_dir,"sam.lzw","keep me".as_bytes())?;
    assert_cmd::Command::cargo_bin("lzw14")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .write_stdin("n\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("abort operation"));
    assert_eq!(std::fs::read(&out_path)?,"keep me".as_bytes());
    assert_cmd::Command::cargo_bin("lzw14")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .write_stdin("y\n")
        .assert()
        .success();
    assert_eq!(std::fs::read(&out_path)?,lzw14::lzw::compress_slice(SAM.as_bytes(),&lzw14::STD_OPTIONS)?);
    Ok(())
}

#[test]
fn usage_on_missing_args() -> STDRESULT {
    Command::cargo_bin("lzw14")?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Command::cargo_bin("lzw14")?
        .arg("compress")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--input"));
    Ok(())
}
