use crate::knox::Knox;
use blsful::inner_types::Scalar;
use indexmap::IndexMap;
use merlin::Transcript;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rand_core::{CryptoRng, RngCore};
use serde::{
    de::{DeserializeOwned, Error as _, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{
    fmt::{self, Formatter},
    hash::Hash,
    marker::PhantomData,
};

/// Map a signed integer into the scalar field, negative values wrap around the modulus
pub fn scalar_from_i64(num: i64) -> Scalar {
    if num < 0 {
        -Scalar::from(num.unsigned_abs())
    } else {
        Scalar::from(num as u64)
    }
}

/// Map an unsigned 128-bit integer into the scalar field
pub fn scalar_from_u128(num: u128) -> Scalar {
    let hi = Scalar::from((num >> 64) as u64);
    let lo = Scalar::from(num as u64);
    hi * Scalar::from(u64::MAX) + hi + lo
}

/// Hash arbitrary bytes to a scalar using SHAKE-256
pub fn hash_to_scalar(dst: &[u8], data: &[u8]) -> Scalar {
    let mut input = Vec::with_capacity(dst.len() + data.len() + 1);
    input.push(dst.len() as u8);
    input.extend_from_slice(dst);
    input.extend_from_slice(data);
    let mut buffer = [0u8; 64];
    Knox::xof_digest::<sha3::Shake256>(&input, &mut buffer);
    Scalar::from_bytes_wide(&buffer)
}

/// Draw a uniform scalar from a transcript
pub fn scalar_from_transcript(transcript: &mut Transcript, label: &'static [u8]) -> Scalar {
    let mut okm = [0u8; 64];
    transcript.challenge_bytes(label, &mut okm);
    Scalar::from_bytes_wide(&okm)
}

/// Create a random alphanumeric string
pub fn random_string(length: usize, mut rng: impl RngCore + CryptoRng) -> String {
    (0..length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Prefix a witness name with the position of the protocol that owns it
pub fn scoped_name(position: &str, name: &str) -> String {
    format!("{}:{}", position, name)
}

/// Serialize an [`IndexMap`] as a map keeping insertion order
pub fn serialize_indexmap<K: Serialize, V: Serialize, S: Serializer>(
    map: &IndexMap<K, V>,
    s: S,
) -> Result<S::Ok, S::Error> {
    let mut i = s.serialize_map(Some(map.len()))?;
    for (k, v) in map {
        i.serialize_entry(k, v)?;
    }
    i.end()
}

/// Deserialize an [`IndexMap`] keeping the encoded order
pub fn deserialize_indexmap<
    'de,
    K: Eq + Hash + DeserializeOwned,
    V: DeserializeOwned,
    D: Deserializer<'de>,
>(
    d: D,
) -> Result<IndexMap<K, V>, D::Error> {
    struct IndexMapVisitor<KK: Eq + Hash + DeserializeOwned, VV: DeserializeOwned> {
        _key_marker: PhantomData<KK>,
        _value_marker: PhantomData<VV>,
    }

    impl<'de, KK: Eq + Hash + DeserializeOwned, VV: DeserializeOwned> Visitor<'de>
        for IndexMapVisitor<KK, VV>
    {
        type Value = IndexMap<KK, VV>;

        fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
            write!(formatter, "a map")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut m = IndexMap::new();
            while let Some((k, v)) = map.next_entry()? {
                m.insert(k, v);
            }
            Ok(m)
        }
    }

    d.deserialize_map(IndexMapVisitor::<K, V> {
        _key_marker: PhantomData,
        _value_marker: PhantomData,
    })
}

/// Serialize bytes as hex in human readable formats, raw otherwise
pub fn serialize_bytes<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    if s.is_human_readable() {
        s.serialize_str(&hex::encode(bytes))
    } else {
        bytes.serialize(s)
    }
}

/// Deserialize bytes written by [`serialize_bytes`]
pub fn deserialize_bytes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    if d.is_human_readable() {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(D::Error::custom)
    } else {
        Vec::<u8>::deserialize(d)
    }
}
