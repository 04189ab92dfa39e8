use std::io::Cursor;

use eventlog_frames::{Endianness, FrameConfig, FrameReader, FrameWriter};

fn main() {
    // Write two frames of three words each, big endian
    let config = FrameConfig::new(3).with_endianness(Endianness::Big);
    let mut writer = FrameWriter::new(Vec::new(), config);
    writer.write_words(&[0x0102, 0x0304, 0x0506]).expect("Write failed");
    writer.write_words(&[0x1112, 0x1314, 0x1516]).expect("Write failed");
    let buffer = writer.finish().expect("Write failed");
    println!("{}", hex::encode_upper(&buffer));

    // Read them back
    let mut reader = FrameReader::new(Cursor::new(buffer), config);
    for frame in reader.read_all() {
        let frame = frame.expect("Read failed");
        println!("{:04X?} crc {:#06x}", frame.words().collect::<Vec<_>>(), frame.checksum);
    }
    println!("{:?}", reader.state());
}
