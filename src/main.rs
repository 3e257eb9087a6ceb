use clap::{arg,crate_version,ArgMatches,Command};
use lzw14::lzw;
use std::path::{Path,PathBuf};
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

fn ok_to_overwrite(path_out: &Path) -> bool {
    if path_out.exists() {
        let mut ans = String::new();
        eprint!("{} exists, overwrite? (y/n) ",path_out.display());
        if std::io::stdin().read_line(&mut ans).is_err() {
            return false;
        }
        return ans.trim_end()=="y" || ans.trim_end()=="Y";
    }
    true
}

/// `<stem><suffix>.<ext>` in the same directory as `path_in`
fn derived_path(path_in: &Path,suffix: &str) -> PathBuf {
    let stem = match path_in.file_stem() {
        Some(s) => s.to_string_lossy().to_string(),
        None => String::new()
    };
    let mut name = [stem.as_str(),suffix].concat();
    if let Some(ext) = path_in.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path_in.with_file_name(name)
}

/// Get the input and output paths, None means the user declined to overwrite
fn get_paths(cmd: &ArgMatches,suffix: &str) -> Option<(PathBuf,PathBuf)> {
    let path_in = PathBuf::from(cmd.get_one::<String>("input").expect(RCH));
    let path_out = match cmd.get_one::<String>("output") {
        Some(p) => PathBuf::from(p),
        None => derived_path(&path_in,suffix)
    };
    log::info!("output path is {}",path_out.display());
    match ok_to_overwrite(&path_out) {
        true => Some((path_in,path_out)),
        false => None
    }
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress:      `lzw14 compress -i my_file.txt -o my_compressed`
Expand:        `lzw14 decompress -i my_compressed -o my_file.txt`
Default name:  `lzw14 compress -i my_file.txt` writes my_file_compressed.txt";

    let mut main_cmd = Command::new("lzw14")
        .about("Compress and expand with 14 bit LZW")
        .after_long_help(long_help)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path, default is <name>_compressed<.ext>").required(false))
        .about("compress a file"));

    main_cmd = main_cmd.subcommand(Command::new("decompress")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path, default is <name>_decompressed<.ext>").required(false))
        .about("decompress a file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let (path_in,path_out) = match get_paths(cmd,"_compressed") {
            Some(paths) => paths,
            None => {
                eprintln!("abort operation");
                return Ok(());
            }
        };
        let start = std::time::Instant::now();
        let sizes = lzw::compress_file(&path_in,&path_out,&lzw::STD_OPTIONS)?;
        eprintln!("compressed {} into {} ({:.1}%) in {:.3} s",sizes.decompressed_size,sizes.compressed_size,
            sizes.ratio(),start.elapsed().as_secs_f64());
    }

    if let Some(cmd) = matches.subcommand_matches("decompress") {
        let (path_in,path_out) = match get_paths(cmd,"_decompressed") {
            Some(paths) => paths,
            None => {
                eprintln!("abort operation");
                return Ok(());
            }
        };
        let start = std::time::Instant::now();
        let sizes = lzw::decompress_file(&path_in,&path_out,&lzw::STD_OPTIONS)?;
        eprintln!("expanded {} into {} ({:.1}%) in {:.3} s",sizes.compressed_size,sizes.decompressed_size,
            sizes.ratio(),start.elapsed().as_secs_f64());
    }

    Ok(())
}
