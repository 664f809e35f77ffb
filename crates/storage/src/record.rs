use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

use kvbridge_common::{MAX_RECORD_FIELD_SIZE, RecordError};

const OP_SET: u8 = 1;
const OP_DEL: u8 = 2;
const OP_CLEAR: u8 = 3;

/// Registro do log append-only.
///
/// Layout: `op:u8 | key_len:u32 BE | key | [value_len:u32 BE | value]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Set { key: String, value: Bytes },
    Del(String),
    Clear,
}

impl Record {
    /// Verifica se um registro completo está disponível no buffer sem alocar.
    /// Retorna Ok(()) se completo, Err(Incomplete) se precisa mais dados.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), RecordError> {
        match get_u8(src)? {
            OP_SET => {
                skip_field(src)?;
                skip_field(src)
            }
            OP_DEL => skip_field(src),
            OP_CLEAR => Ok(()),
            byte => Err(RecordError::InvalidOp(byte)),
        }
    }

    /// Faz o parse de um registro completo a partir do cursor.
    /// Deve ser chamado apenas após `check()` retornar Ok.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Record, RecordError> {
        match get_u8(src)? {
            OP_SET => {
                let key = get_key(src)?;
                let value = get_field(src)?;
                Ok(Record::Set { key, value })
            }
            OP_DEL => Ok(Record::Del(get_key(src)?)),
            OP_CLEAR => Ok(Record::Clear),
            byte => Err(RecordError::InvalidOp(byte)),
        }
    }

    /// Encoda o registro no buffer de saída.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Record::Set { key, value } => {
                dst.put_u8(OP_SET);
                put_field(dst, key.as_bytes());
                put_field(dst, value);
            }
            Record::Del(key) => {
                dst.put_u8(OP_DEL);
                put_field(dst, key.as_bytes());
            }
            Record::Clear => dst.put_u8(OP_CLEAR),
        }
    }
}

fn put_field(dst: &mut BytesMut, data: &[u8]) {
    dst.put_u32(data.len() as u32);
    dst.put(data);
}

fn get_u8(src: &mut Cursor<&[u8]>) -> Result<u8, RecordError> {
    if !src.has_remaining() {
        return Err(RecordError::Incomplete);
    }
    Ok(src.get_u8())
}

fn get_len(src: &mut Cursor<&[u8]>) -> Result<usize, RecordError> {
    if src.remaining() < 4 {
        return Err(RecordError::Incomplete);
    }
    let len = src.get_u32() as usize;
    if len > MAX_RECORD_FIELD_SIZE {
        return Err(RecordError::FieldTooLarge(len));
    }
    Ok(len)
}

fn skip_field(src: &mut Cursor<&[u8]>) -> Result<(), RecordError> {
    let len = get_len(src)?;
    if src.remaining() < len {
        return Err(RecordError::Incomplete);
    }
    src.advance(len);
    Ok(())
}

fn get_field(src: &mut Cursor<&[u8]>) -> Result<Bytes, RecordError> {
    let len = get_len(src)?;
    if src.remaining() < len {
        return Err(RecordError::Incomplete);
    }
    let data = Bytes::copy_from_slice(&src.chunk()[..len]);
    src.advance(len);
    Ok(data)
}

fn get_key(src: &mut Cursor<&[u8]>) -> Result<String, RecordError> {
    let raw = get_field(src)?;
    String::from_utf8(raw.to_vec()).map_err(|e| RecordError::InvalidEncoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(record: &Record) -> BytesMut {
        let mut buf = BytesMut::new();
        record.encode(&mut buf);
        buf
    }

    #[test]
    fn set_record_layout() {
        let buf = encoded(&Record::Set {
            key: "k".into(),
            value: Bytes::from("vv"),
        });
        assert_eq!(&buf[..], b"\x01\x00\x00\x00\x01k\x00\x00\x00\x02vv");
    }

    #[test]
    fn parse_sequence() {
        let mut buf = encoded(&Record::Set {
            key: "foo".into(),
            value: Bytes::from("bar"),
        });
        Record::Del("foo".into()).encode(&mut buf);
        Record::Clear.encode(&mut buf);

        let mut cursor = Cursor::new(&buf[..]);
        assert_eq!(
            Record::parse(&mut cursor).unwrap(),
            Record::Set {
                key: "foo".into(),
                value: Bytes::from("bar"),
            }
        );
        assert_eq!(Record::parse(&mut cursor).unwrap(), Record::Del("foo".into()));
        assert_eq!(Record::parse(&mut cursor).unwrap(), Record::Clear);
        assert!(!cursor.has_remaining());
    }

    #[test]
    fn check_incomplete() {
        let buf = encoded(&Record::Set {
            key: "foo".into(),
            value: Bytes::from("bar"),
        });
        for cut in 0..buf.len() {
            let mut cursor = Cursor::new(&buf[..cut]);
            assert!(matches!(
                Record::check(&mut cursor),
                Err(RecordError::Incomplete)
            ));
        }
        let mut cursor = Cursor::new(&buf[..]);
        assert!(Record::check(&mut cursor).is_ok());
    }

    #[test]
    fn check_invalid_op() {
        let data = [0x42u8, 0, 0];
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            Record::check(&mut cursor),
            Err(RecordError::InvalidOp(0x42))
        ));
    }

    #[test]
    fn check_field_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u8(OP_DEL);
        buf.put_u32(u32::MAX);
        let mut cursor = Cursor::new(&buf[..]);
        assert!(matches!(
            Record::check(&mut cursor),
            Err(RecordError::FieldTooLarge(_))
        ));
    }

    #[test]
    fn parse_invalid_utf8_key() {
        let mut buf = BytesMut::new();
        buf.put_u8(OP_DEL);
        put_field(&mut buf, &[0xff, 0xfe]);
        let mut cursor = Cursor::new(&buf[..]);
        assert!(matches!(
            Record::parse(&mut cursor),
            Err(RecordError::InvalidEncoding(_))
        ));
    }
}
