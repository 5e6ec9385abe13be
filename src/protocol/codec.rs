//! Serde helpers for the wire encodings: field elements as decimal strings
//! (big-integer safe), curve points as coordinate pairs, masked cards as
//! 6-tuples of coordinates.

use std::str::FromStr;

use ark_ff::PrimeField;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cards::MaskedCard;
use crate::crypto::{BaseField, CurvePoint};

pub fn field_to_string(value: &BaseField) -> String {
    value.into_bigint().to_string()
}

pub fn parse_field(s: &str) -> Result<BaseField, String> {
    BaseField::from_str(s.trim()).map_err(|_| format!("malformed field element: {s}"))
}

/// Decimal-string encoding for a single field element.
pub mod field {
    use super::*;

    pub fn serialize<S: Serializer>(value: &BaseField, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&field_to_string(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BaseField, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_field(&s).map_err(DeError::custom)
    }
}

/// A curve point as a pair of decimal strings. The identity travels as its
/// affine encoding ("0", "1") and is normalized back on parse.
pub mod point {
    use super::*;

    pub fn serialize<S: Serializer>(value: &CurvePoint, serializer: S) -> Result<S::Ok, S::Error> {
        [field_to_string(&value.x), field_to_string(&value.y)].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CurvePoint, D::Error> {
        let pair = <[String; 2]>::deserialize(deserializer)?;
        let x = parse_field(&pair[0]).map_err(DeError::custom)?;
        let y = parse_field(&pair[1]).map_err(DeError::custom)?;
        CurvePoint::new(x, y).map_err(DeError::custom)
    }
}

/// A masked card as the 6-tuple (epk.x, epk.y, msg.x, msg.y, pk.x, pk.y).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCard(pub [String; 6]);

impl From<&MaskedCard> for WireCard {
    fn from(card: &MaskedCard) -> Self {
        WireCard([
            field_to_string(&card.epk.x),
            field_to_string(&card.epk.y),
            field_to_string(&card.msg.x),
            field_to_string(&card.msg.y),
            field_to_string(&card.pk.x),
            field_to_string(&card.pk.y),
        ])
    }
}

impl WireCard {
    pub fn decode(&self) -> Result<MaskedCard, String> {
        let coords: Vec<BaseField> = self
            .0
            .iter()
            .map(|s| parse_field(s))
            .collect::<Result<_, _>>()?;
        let build = |x, y| CurvePoint::new(x, y).map_err(|err| err.to_string());
        Ok(MaskedCard {
            epk: build(coords[0], coords[1])?,
            msg: build(coords[2], coords[3])?,
            pk: build(coords[4], coords[5])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::card_value_point;
    use crate::crypto::curve::random_scalar;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn wire_card_round_trips() {
        let mut rng = StdRng::seed_from_u64(9);
        let secret = random_scalar(&mut rng);
        let nonce = random_scalar(&mut rng);
        let card = MaskedCard::face_up(3).add_and_mask(&secret, &nonce).unwrap();

        let wire = WireCard::from(&card);
        assert_eq!(wire.decode().unwrap(), card);
    }

    #[test]
    fn face_up_card_keeps_its_identity_layers() {
        let card = MaskedCard::face_up(0);
        let decoded = WireCard::from(&card).decode().unwrap();
        assert!(decoded.epk.is_identity());
        assert!(decoded.pk.is_identity());
        assert_eq!(decoded.msg, card_value_point(0));
    }

    #[test]
    fn off_curve_coordinates_are_rejected() {
        let wire = WireCard([
            "0".into(),
            "1".into(),
            "5".into(),
            "5".into(),
            "0".into(),
            "1".into(),
        ]);
        assert!(wire.decode().is_err());
    }
}
