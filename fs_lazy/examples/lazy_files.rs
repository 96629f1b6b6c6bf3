//! Showcasing lazy temporary files handed to a block.

use std::io::{Read, Seek, SeekFrom, Write};

use fs_lazy::{with_files, LazyFile, Operation};

fn main() -> fs_lazy::Result<()> {
    with_files("printio", |diary: &mut LazyFile, spare: &mut LazyFile| {
        // Neither file exists yet
        assert!(!diary.is_realized());
        assert!(!spare.is_realized());

        // Capability queries don't create anything either
        assert!(spare.supports(Operation::Write));
        assert!(!spare.is_realized());

        // The first real operation creates the backing file
        diary.write_all(b"Dear diary, today I stayed lazy.")?;
        println!("diary lives at {:?}", diary.path()?);
        println!("diary size is {} bytes", diary.size()?);

        diary.seek(SeekFrom::Start(0))?;
        let mut entry = String::new();
        diary.read_to_string(&mut entry)?;
        println!("it reads: {}", entry);

        // `spare` was never touched, so it never hit the disk
        Ok(())
    })?;
    // And here the diary is deleted again
    println!("all cleaned up");
    Ok(())
}
