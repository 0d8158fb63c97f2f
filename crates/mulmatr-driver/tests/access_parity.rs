//! Text and binary access layers driving one device must agree

use mulmatr_driver::prelude::*;
use mulmatr_driver::emu::ControlCommand;
use mulmatr_driver::Command;

fn both(
    bus: &SharedDevice,
) -> (TextInterface<SharedDevice>, BinaryInterface<SharedDevice>) {
    (
        TextInterface::probe(bus.clone()).unwrap(),
        BinaryInterface::probe(bus.clone()).unwrap(),
    )
}

#[test]
fn text_writes_binary_reads() {
    let bus = SharedDevice::default();
    let (text, binary) = both(&bus);

    text.store(Attribute::Size, "3\n").unwrap();
    text.store(Attribute::MatrA, "1,2,3\n4,5,6\n7,8,9\n").unwrap();
    text.store(Attribute::MatrB, "0x1,0x0,0x2").unwrap();
    text.store(Attribute::Control, "0x5").unwrap();

    let mut s = binary.open().unwrap();
    assert_eq!(s.read_size().unwrap(), 3);
    assert_eq!(s.read_matrix_a().unwrap(), (1..=9).collect::<Vec<_>>());
    assert_eq!(s.read_matrix_b().unwrap(), vec![1, 0, 2]);
    assert_eq!(s.read_matrix_c().unwrap(), vec![7, 16, 25]);
}

#[test]
fn binary_writes_text_reads() {
    let bus = SharedDevice::default();
    let (text, binary) = both(&bus);
    {
        let mut s = binary.open().unwrap();
        s.write_size(2).unwrap();
        s.write_matrix_a(&[1, -1, 0, 2]).unwrap();
        s.write_matrix_b(&[5, 3]).unwrap();
        s.start_op().unwrap();
    }
    assert_eq!(text.show(Attribute::Status).unwrap(), "0x3\n");
    assert_eq!(text.show(Attribute::MatrA).unwrap(), "0x1,0xffffffff\n0x0,0x2\n");
    assert_eq!(text.show(Attribute::MatrC).unwrap(), "0x2,0x6\n");
}

#[test]
fn raw_numbers_match_typed_calls() {
    let bus = SharedDevice::default();
    let (_, binary) = both(&bus);
    let mut s = binary.open().unwrap();

    let mut word = [0u8; 4];
    s.ioctl_raw(0x8008_6162, &mut word).unwrap();
    assert_eq!(u32::from_ne_bytes(word), s.read_id().unwrap());

    let mut size = 5u32.to_ne_bytes();
    s.ioctl_raw(Command::WriteSize.raw(), &mut size).unwrap();
    assert_eq!(s.read_size().unwrap(), 5);
}

#[test]
fn text_layer_is_not_gated() {
    let bus = SharedDevice::default();
    let (text, binary) = both(&bus);
    let _session = binary.open().unwrap();
    assert_eq!(text.show(Attribute::Id).unwrap(), "0xc1a0\n");
    assert!(text.store(Attribute::Size, "2").is_ok());
}

#[test]
fn text_over_mapped_window() {
    let file = tempfile::NamedTempFile::new().unwrap();
    file.as_file().set_len(0x500).unwrap();
    let window = MmioWindow::open(file.path(), 0x500).unwrap();
    let text = TextInterface::probe(window).unwrap();

    // a plain file has no device behind it: registers are just memory
    assert_eq!(text.show(Attribute::Control).unwrap(), "0x1\n");
    text.store(Attribute::Size, "2").unwrap();
    text.store(Attribute::MatrB, "0x10,0x20").unwrap();
    assert_eq!(text.show(Attribute::MatrB).unwrap(), "0x10,0x20\n");
    assert!(matches!(
        text.bus().read32(0x500),
        Err(MulmatrError::AddressInvalid { offset: 0x500 })
    ));
}

#[test]
fn binary_and_control_commands_are_distinct_types() {
    assert_eq!(Command::StartOp.name(), "CTRL_START_OP");
    assert_eq!(
        ControlCommand::from_control(mulmatr_driver::ControlFlags::START_OP),
        ControlCommand::StartOp
    );
}
