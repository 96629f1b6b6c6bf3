//! Showcasing session options and cleanup on a failing block.

use std::io::Write;
use std::path::PathBuf;

use fs_lazy::{Error, LazyFile, Session};

fn main() {
    let mut created = PathBuf::new();
    // Files land in the current directory, named printio*.log
    let result = Session::new("printio")
        .in_dir(".")
        .suffix(".log")
        .run(|log: &mut LazyFile| -> fs_lazy::Result<()> {
            log.write_all(b"about to fail")?;
            created = log.path()?;
            println!("created {:?}", created);
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "something went wrong",
            )))
        });

    // The block's error came back out, and the file is gone regardless
    match result {
        Err(err) => println!("block failed as planned: {}", err),
        Ok(()) => println!("the block was supposed to fail"),
    }
    println!("{:?} still exists: {}", created, created.exists());
}
