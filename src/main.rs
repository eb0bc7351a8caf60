use std::env;
use std::process;

use anyhow::Context;
use bitmat::{compress_dense, Config, HashBounds, LzmaBackend, MatrixReader};

const USAGE: &str = "\
Usage:
  bitmat compress   <input> <config> <hash-bounds> <partition> <output-prefix> <header-size>
  bitmat decompress <config> <matrix> <index> <header-size> <output>";

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("compress") if args.len() == 8 => compress(&args[2..]),
        Some("decompress") if args.len() == 7 => decompress(&args[2..]),
        _ => {
            eprintln!("{USAGE}");
            process::exit(2);
        }
    }
}

fn compress(args: &[String]) -> anyhow::Result<()> {
    let [input, config_path, bounds_path, partition, prefix, header_size] = args else {
        unreachable!("argument count checked by the caller");
    };
    let partition: u64 = partition
        .parse()
        .with_context(|| format!("invalid partition '{partition}'"))?;
    let header_size: u64 = header_size
        .parse()
        .with_context(|| format!("invalid header size '{header_size}'"))?;

    let config = Config::from_path(config_path)?;
    let bounds = HashBounds::from_path(bounds_path)?;
    let backend = LzmaBackend::new(config.preset(), config.block_decoded_size())?;
    compress_dense(
        backend,
        &config,
        &bounds,
        input,
        prefix,
        Some(partition),
        header_size,
    )?;
    Ok(())
}

fn decompress(args: &[String]) -> anyhow::Result<()> {
    let [config_path, matrix, index, header_size, output] = args else {
        unreachable!("argument count checked by the caller");
    };
    let header_size: u64 = header_size
        .parse()
        .with_context(|| format!("invalid header size '{header_size}'"))?;

    let config = Config::from_path(config_path)?;
    let backend = LzmaBackend::new(config.preset(), config.block_decoded_size())?;
    // full reconstruction never maps keys, so the minimum key is irrelevant
    let mut reader = MatrixReader::new(backend, &config, 0, matrix, index, header_size)?;
    reader.decompress_all(output)?;
    Ok(())
}
