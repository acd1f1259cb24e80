mod common;

use common::Header;
use phase2_fed::{
    Error, FedBuffer,
    channel::{ChannelDescriptor, ChannelTableError, channel_descriptors},
    cursor::{BitCursor, OutOfRange},
    header::decode_header,
    layout::{self, CHANNELS_PER_FED, STRIPS_PER_CBC},
};

#[test]
fn table_spans_the_grid_without_frontends() {
    let data = Header::default().encode(&[]);
    let (header, _) = decode_header(&data).unwrap();

    let table = channel_descriptors(&data, &header).unwrap();

    assert_eq!(table.len(), CHANNELS_PER_FED);
    assert!(table.iter().all(|d| d.length == 0));
}

#[test]
fn unsparsified_channels_are_back_to_back() {
    let fields = Header {
        chips: 4,
        frontends: 1 << 3,
        ..Default::default()
    };
    let data = common::unsparsified(&fields);
    let (header, len) = decode_header(&data).unwrap();

    let table = channel_descriptors(&data, &header).unwrap();

    assert_eq!(table.len(), CHANNELS_PER_FED);
    for chip in 0..4 {
        assert_eq!(
            table[3 * 16 + chip],
            ChannelDescriptor {
                offset: len * 8 + chip * STRIPS_PER_CBC,
                length: STRIPS_PER_CBC as u16,
            }
        );
    }

    // Chips beyond the declared count, and every other front-end, are empty.
    let populated = table.iter().filter(|d| d.length != 0).count();
    assert_eq!(populated, 4);
    for frontend in (0..16).filter(|fe| *fe != 3) {
        assert!(table[frontend * 16..][..16].iter().all(|d| d.length == 0));
    }
}

#[test]
fn unsparsified_payload_overrun() {
    let fields = Header {
        chips: 16,
        frontends: 0b11,
        ..Default::default()
    };
    let mut data = fields.encode_default();
    data.extend([0; 125]);
    let (header, _) = decode_header(&data).unwrap();

    assert_eq!(
        channel_descriptors(&data, &header).unwrap_err(),
        ChannelTableError::PayloadOverrun {
            channel: 3,
            needed: 254,
            available: 125 * 8 - 3 * 254,
        }
    );
}

#[test]
fn sparsified_lengths_come_from_count_table() {
    let fields = Header {
        chips: 2,
        frontends: 0b110,
        ..Default::default()
    };
    let data = common::sparsified(
        &fields,
        &[&[(3, 2), (100, 8)], &[], &[(0, 1)], &[(7, 3), (20, 1), (253, 1)]],
    );
    let (header, len) = decode_header(&data).unwrap();
    assert_eq!(len, 24);

    let table = channel_descriptors(&data, &header).unwrap();

    let start = (len + 8) * 8;
    assert_eq!(
        [table[16], table[17], table[32], table[33]],
        [
            ChannelDescriptor {
                offset: start,
                length: 2
            },
            ChannelDescriptor {
                offset: start + 22,
                length: 0
            },
            ChannelDescriptor {
                offset: start + 22,
                length: 1
            },
            ChannelDescriptor {
                offset: start + 33,
                length: 3
            },
        ]
    );
    assert_eq!(table.iter().filter(|d| d.length != 0).count(), 3);
}

#[test]
fn truncated_count_table() {
    let fields = Header {
        chips: 8,
        frontends: 0b1,
        readout_mode: 1,
        ..Default::default()
    };
    let mut data = fields.encode_default();
    // Only the first of the two count-table words.
    data.extend(common::count_table(&[1, 1, 1, 1]));

    let (header, _) = decode_header(&data).unwrap();
    assert_eq!(
        channel_descriptors(&data, &header).unwrap_err(),
        ChannelTableError::TruncatedCountTable { channel: 4 }
    );

    let buffer = FedBuffer::new(&data).unwrap();
    let err = Error::MalformedChannelTable(ChannelTableError::TruncatedCountTable { channel: 4 });
    assert_eq!(buffer.channel_table().unwrap_err(), err);
    assert_eq!(buffer.channel(0).unwrap_err(), err);
    assert!(buffer.channels().is_err());
}

#[test]
fn sparsified_payload_overrun() {
    let fields = Header {
        chips: 1,
        frontends: 0b1,
        readout_mode: 1,
        ..Default::default()
    };
    let mut data = fields.encode_default();
    data.extend(common::count_table(&[100]));
    data.extend([0; 8]);

    let (header, _) = decode_header(&data).unwrap();
    assert_eq!(
        channel_descriptors(&data, &header).unwrap_err(),
        ChannelTableError::PayloadOverrun {
            channel: 0,
            needed: 1100,
            available: 64,
        }
    );
}

#[test]
fn channel_index_out_of_range() {
    let data = common::unsparsified(&Header {
        chips: 1,
        frontends: 1,
        ..Default::default()
    });
    let buffer = FedBuffer::new(&data).unwrap();

    assert!(buffer.channel(255).is_ok());
    assert_eq!(buffer.channel(256).unwrap_err(), Error::Index(256));
    assert_eq!(buffer.channel(usize::MAX).unwrap_err(), Error::Index(usize::MAX));
}

#[test]
fn channels_iterate_in_index_order() {
    let fields = Header {
        chips: 3,
        frontends: 0b1000_0000_0000_0010,
        ..Default::default()
    };
    let data = common::unsparsified(&fields);
    let buffer = FedBuffer::new(&data).unwrap();

    let lengths: Vec<usize> = buffer.channels().unwrap().map(|c| c.length()).collect();
    assert_eq!(lengths.len(), CHANNELS_PER_FED);

    let populated: Vec<usize> = (0..CHANNELS_PER_FED).filter(|i| lengths[*i] != 0).collect();
    assert_eq!(populated, common::listed(&fields));
    assert_eq!(populated, [16, 17, 18, 240, 241, 242]);
}

#[test]
fn cursor_errors_convert_into_buffer_errors() {
    fn first_count(data: &[u8], header_len: usize) -> Result<u64, Error> {
        let mut cursor = BitCursor::at(data, header_len, 0)?;
        Ok(cursor.read_bits(layout::CLUSTER_COUNT_BITS, layout::HEADER)?)
    }

    let data = Header::default().encode(&[]);

    assert_eq!(
        first_count(&data, 16).unwrap_err(),
        Error::OutOfRange(OutOfRange {
            position: 128,
            requested: 16,
            remaining: 0,
        })
    );
    assert!(matches!(
        first_count(&data, 17).unwrap_err(),
        Error::OutOfRange(_)
    ));
}
