use eventlog_frames::{Endianness, FrameConfig};

fn main() {
    // Load file.bin, 8 payload words per frame, written on a big endian logger
    let config = FrameConfig::new(8).with_endianness(Endianness::Big);
    let frames = eventlog_frames::read_file("file.bin", config).unwrap();
    println!("{frames:#?}");
}
