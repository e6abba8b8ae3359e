use clap::{arg,crate_version,Command};
use std::io::{Read,Seek,SeekFrom,Write};
use std::path::{Path,PathBuf};
use oldpack::{pack,Error};

fn exit_code(err: &Error) -> i32 {
    match err {
        Error::UnexpectedEndOfStream => 4,
        Error::Write(_) => 3,
        Error::Read(_) => 2,
        _ => 1
    }
}

/// print the per-symbol table the historic `-` flag printed, row layout
/// `%10ld%8ld%% <%3o> = <c>  code` with the glyph slot empty for
/// non-printing bytes
fn print_stats(path: &str, model: &pack::Model) {
    eprintln!("\n{}: {} Bytes",path,model.size);
    for (sym,freq,code) in model.stats() {
        let glyph = match sym {
            0x20..=0x7f => format!("{}>  ",sym as char),
            _ => ">   ".to_string()
        };
        eprintln!("{:10}{:8}% <{:3o}> = <{}{}",freq,100*freq/model.size,sym,glyph,code);
    }
    eprintln!("{}: Packed size: {} bytes",path,model.packed_size());
}

/// Compress one file.  Returns the exit code contribution for the batch;
/// skips (trivial file, no blocks saved) report and return 0.
fn pack_file(path: &str, to_stdout: bool, force: bool, stats: bool) -> i32 {
    let mut in_file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}: unable to open ({})",path,e);
            return 2;
        }
    };
    if !to_stdout {
        let meta = match in_file.metadata() {
            Ok(m) => m,
            Err(e) => {
                eprintln!("{}: unable to stat ({})",path,e);
                return 2;
            }
        };
        if !meta.is_file() {
            eprintln!("{}: not a plain file",path);
            return 1;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            if meta.nlink() > 1 {
                eprintln!("{}: has links",path);
                return 1;
            }
        }
    }
    let out_path: PathBuf = PathBuf::from([path,".z"].concat());
    if !to_stdout && out_path.exists() {
        eprintln!("{}: already exists",out_path.display());
        return 1;
    }
    let model = match pack::Model::analyze(&mut in_file) {
        Ok(m) => m,
        Err(Error::TrivialFile) => {
            eprintln!("{}: trivial file - not packed",path);
            return 0;
        },
        Err(e) => {
            eprintln!("{}: {}",path,e);
            return exit_code(&e);
        }
    };
    if stats {
        print_stats(path,&model);
    }
    if !force && !model.saves_blocks() {
        eprintln!("{}: not packed (no blocks saved)",path);
        return 0;
    }
    if let Err(e) = in_file.seek(SeekFrom::Start(0)) {
        eprintln!("{}: {}",path,e);
        return 2;
    }
    let written = if to_stdout {
        let stdout = std::io::stdout();
        let mut snk = std::io::BufWriter::new(stdout.lock());
        model.write_stream(&mut in_file,&mut snk).and_then(|n| {
            snk.flush().map_err(Error::Write)?;
            Ok(n)
        })
    } else {
        let out_file = match std::fs::File::create(&out_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("{}: unable to create ({})",out_path.display(),e);
                return 2;
            }
        };
        let mut snk = std::io::BufWriter::new(out_file);
        model.write_stream(&mut in_file,&mut snk).and_then(|n| {
            snk.flush().map_err(Error::Write)?;
            Ok(n)
        })
    };
    match written {
        Ok(out_size) => {
            if !to_stdout {
                // carry permissions over, then retire the original
                if let Ok(meta) = in_file.metadata() {
                    if let Err(e) = std::fs::set_permissions(&out_path,meta.permissions()) {
                        log::warn!("could not copy permissions to {}: {}",out_path.display(),e);
                    }
                }
                if let Err(e) = std::fs::remove_file(path) {
                    log::warn!("could not remove {}: {}",path,e);
                }
            }
            let saved = 100 * (model.size as i64 - out_size as i64) / model.size as i64;
            eprintln!("{}: {}% compression",path,saved);
            0
        },
        Err(e) => {
            eprintln!("{}: {} - file unchanged",path,e);
            if !to_stdout {
                // never leave a truncated .z behind
                if let Err(e) = std::fs::remove_file(&out_path) {
                    log::warn!("could not remove partial {}: {}",out_path.display(),e);
                }
            }
            exit_code(&e)
        }
    }
}

/// Expand one file in place.  The argument may name the packed file
/// (`name.z`) or its result (`name`, the suffix is appended to find the
/// input); `name` is created next to `name.z`, which is removed on success.
fn unpack_file(path: &str) -> i32 {
    let (in_path,out_path) = match path.strip_suffix(".z") {
        Some(stem) => (PathBuf::from(path),PathBuf::from(stem)),
        None => (PathBuf::from([path,".z"].concat()),PathBuf::from(path))
    };
    let mut in_file = match std::fs::File::open(&in_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}: unable to open ({})",in_path.display(),e);
            return 2;
        }
    };
    // check the signature before touching the output name
    let mut sig: [u8;2] = [0;2];
    if in_file.read_exact(&mut sig).is_err() || u16::from_le_bytes(sig) != pack::MAGIC {
        eprintln!("{}: old pack signature not found",in_path.display());
        return 1;
    }
    if let Err(e) = in_file.seek(SeekFrom::Start(0)) {
        eprintln!("{}: {}",in_path.display(),e);
        return 2;
    }
    if out_path.exists() {
        eprintln!("{}: already exists",out_path.display());
        return 1;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if in_file.metadata().map(|m| m.nlink() > 1).unwrap_or(false) {
            eprintln!("warning: '{}' has links",in_path.display());
        }
    }
    let mut out_file = match std::fs::File::create(&out_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}: unable to create ({})",out_path.display(),e);
            return 2;
        }
    };
    match pack::expand(&mut in_file,&mut out_file) {
        Ok((in_size,out_size)) => {
            // carry permissions over, then retire the packed file
            if let Ok(meta) = in_file.metadata() {
                if let Err(e) = std::fs::set_permissions(&out_path,meta.permissions()) {
                    log::warn!("could not copy permissions to {}: {}",out_path.display(),e);
                }
            }
            if let Err(e) = std::fs::remove_file(&in_path) {
                log::warn!("could not remove {}: {}",in_path.display(),e);
            }
            log::info!("{}: expanded {} into {}",in_path.display(),in_size,out_size);
            0
        },
        Err(e) => {
            eprintln!("{}: {} - file unchanged",in_path.display(),e);
            // never leave a truncated output behind
            if let Err(e) = std::fs::remove_file(&out_path) {
                log::warn!("could not remove partial {}: {}",out_path.display(),e);
            }
            exit_code(&e)
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress in place:      `oldpack big.txt`           (writes big.txt.z, removes big.txt)
Compress to stdout:     `oldpack -c -s big.txt > big.txt.z`
Expand in place:        `oldpack -d big.txt.z`      (writes big.txt, removes big.txt.z)
Expand to stdout:       `oldpack -d -c big.txt.z > big.txt`
Expand a raw stream:    `oldpack -d < big.txt.z > big.txt`";

    let matches = Command::new("oldpack")
        .about("Compress and expand files in the old Unix pack format")
        .after_long_help(long_help)
        .version(crate_version!())
        .arg(arg!(-d --decompress "expand instead of compress"))
        .arg(arg!(-c --stdout "write the result to standard output"))
        .arg(arg!(-s --force "keep the packed file even when no disk block is saved"))
        .arg(arg!(-i --info "print per-symbol statistics to stderr"))
        .arg(arg!([file] ... "files to process"))
        .get_matches();

    let decompress = matches.get_flag("decompress");
    let to_stdout = matches.get_flag("stdout");
    let force = matches.get_flag("force");
    let stats = matches.get_flag("info");
    let files: Vec<String> = match matches.get_many::<String>("file") {
        Some(v) => v.cloned().collect(),
        None => Vec::new()
    };

    let mut code = 0;

    if decompress {
        if files.is_empty() {
            // raw stream mode, any stream-integrity failure is fatal
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            if let Err(e) = pack::expand(&mut stdin.lock(),&mut stdout.lock()) {
                eprintln!("{}",e);
                std::process::exit(exit_code(&e));
            }
            return;
        }
        if !to_stdout {
            for path in &files {
                let c = unpack_file(path);
                if c != 0 {
                    code = c;
                }
            }
            std::process::exit(code);
        }
        for path in &files {
            let mut in_file = match std::fs::File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("{}: unable to open ({})",path,e);
                    code = 2;
                    continue;
                }
            };
            let stdout = std::io::stdout();
            match pack::expand(&mut in_file,&mut stdout.lock()) {
                Ok((in_size,out_size)) => {
                    log::info!("{}: expanded {} into {}",path,in_size,out_size);
                },
                Err(Error::BadMagic) => {
                    // not a packed file, skip it and keep scanning
                    eprintln!("{}: old pack signature not found",path);
                    code = 1;
                },
                Err(e) => {
                    // truncation or a bad tree leaves nothing to resume from
                    eprintln!("{}: {}",path,e);
                    std::process::exit(exit_code(&e));
                }
            }
        }
        std::process::exit(code);
    }

    if files.is_empty() {
        eprintln!("no files to pack (see --help)");
        std::process::exit(1);
    }
    for path in &files {
        if !to_stdout && Path::new(path).extension().map(|e| e == "z").unwrap_or(false) {
            eprintln!("{}: already packed",path);
            continue;
        }
        let c = pack_file(path,to_stdout,force,stats);
        if c != 0 {
            code = c;
        }
    }
    std::process::exit(code);
}
