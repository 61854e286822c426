//! MODP group parameters for finite-field Diffie-Hellman.
//!
//! Ships the six RFC 3526 groups (all safe primes with generator 2) and
//! accepts custom groups after checking that the modulus is a safe prime.
//! Well-known groups are built once per process and shared as `Arc`s.

use std::fmt;
use std::sync::{Arc, OnceLock};

use log::debug;
use num_bigint_dig::prime::probably_prime;
use num_bigint_dig::BigUint;
use num_traits::One;

use crate::error::{Error, Result};

/// Miller-Rabin rounds used when checking custom moduli.
const PRIMALITY_ROUNDS: usize = 20;

/// The MODP groups defined in RFC 3526.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rfc3526Group {
    Modp1536,
    Modp2048,
    Modp3072,
    Modp4096,
    Modp6144,
    Modp8192,
}

impl Rfc3526Group {
    pub const ALL: [Rfc3526Group; 6] = [
        Rfc3526Group::Modp1536,
        Rfc3526Group::Modp2048,
        Rfc3526Group::Modp3072,
        Rfc3526Group::Modp4096,
        Rfc3526Group::Modp6144,
        Rfc3526Group::Modp8192,
    ];

    /// Size of the prime modulus in bits.
    pub fn bits(self) -> usize {
        match self {
            Rfc3526Group::Modp1536 => 1536,
            Rfc3526Group::Modp2048 => 2048,
            Rfc3526Group::Modp3072 => 3072,
            Rfc3526Group::Modp4096 => 4096,
            Rfc3526Group::Modp6144 => 6144,
            Rfc3526Group::Modp8192 => 8192,
        }
    }

    /// IKE group number assigned by the RFC.
    pub fn group_number(self) -> u8 {
        match self {
            Rfc3526Group::Modp1536 => 5,
            Rfc3526Group::Modp2048 => 14,
            Rfc3526Group::Modp3072 => 15,
            Rfc3526Group::Modp4096 => 16,
            Rfc3526Group::Modp6144 => 17,
            Rfc3526Group::Modp8192 => 18,
        }
    }

    fn prime_hex(self) -> &'static str {
        match self {
            Rfc3526Group::Modp1536 => MODP_1536_P,
            Rfc3526Group::Modp2048 => MODP_2048_P,
            Rfc3526Group::Modp3072 => MODP_3072_P,
            Rfc3526Group::Modp4096 => MODP_4096_P,
            Rfc3526Group::Modp6144 => MODP_6144_P,
            Rfc3526Group::Modp8192 => MODP_8192_P,
        }
    }

    fn cell(self) -> &'static OnceLock<Arc<ModpGroup>> {
        static MODP_1536: OnceLock<Arc<ModpGroup>> = OnceLock::new();
        static MODP_2048: OnceLock<Arc<ModpGroup>> = OnceLock::new();
        static MODP_3072: OnceLock<Arc<ModpGroup>> = OnceLock::new();
        static MODP_4096: OnceLock<Arc<ModpGroup>> = OnceLock::new();
        static MODP_6144: OnceLock<Arc<ModpGroup>> = OnceLock::new();
        static MODP_8192: OnceLock<Arc<ModpGroup>> = OnceLock::new();
        match self {
            Rfc3526Group::Modp1536 => &MODP_1536,
            Rfc3526Group::Modp2048 => &MODP_2048,
            Rfc3526Group::Modp3072 => &MODP_3072,
            Rfc3526Group::Modp4096 => &MODP_4096,
            Rfc3526Group::Modp6144 => &MODP_6144,
            Rfc3526Group::Modp8192 => &MODP_8192,
        }
    }
}

impl fmt::Display for Rfc3526Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modp{} (RFC 3526 group {})", self.bits(), self.group_number())
    }
}

/// Where a group's parameters came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupId {
    Rfc3526(Rfc3526Group),
    Custom,
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupId::Rfc3526(group) => write!(f, "{}", group),
            GroupId::Custom => f.write_str("custom"),
        }
    }
}

/// Diffie-Hellman group parameters: a safe prime `p` and a generator `g`
/// of the subgroup of order `q = (p - 1) / 2`.
#[derive(Clone, PartialEq, Eq)]
pub struct ModpGroup {
    id: GroupId,
    p: BigUint,
    g: BigUint,
    q: BigUint,
    p_minus_one: BigUint,
    byte_len: usize,
}

impl ModpGroup {
    /// Shared handle to one of the RFC 3526 groups.
    pub fn rfc3526(group: Rfc3526Group) -> Arc<ModpGroup> {
        group
            .cell()
            .get_or_init(|| {
                debug!("initialising {}", group);
                Arc::new(ModpGroup::from_rfc3526(group))
            })
            .clone()
    }

    fn from_rfc3526(group: Rfc3526Group) -> Self {
        let p = BigUint::parse_bytes(group.prime_hex().as_bytes(), 16)
            .expect("RFC 3526 prime constants are valid hex");
        Self::from_parts(GroupId::Rfc3526(group), p, BigUint::from(2u32))
    }

    fn from_parts(id: GroupId, p: BigUint, g: BigUint) -> Self {
        let p_minus_one = &p - BigUint::one();
        let q = &p_minus_one >> 1usize;
        let byte_len = (p.bits() + 7) / 8;
        ModpGroup {
            id,
            p,
            g,
            q,
            p_minus_one,
            byte_len,
        }
    }

    /// Builds a custom group, rejecting parameters the public value check
    /// cannot rely on.
    ///
    /// # Errors
    /// * `Error::InvalidGroup` if `p` is not a safe prime, or `g` is outside
    ///   `[2, p - 2]` or does not generate the order-`q` subgroup.
    pub fn new(p: BigUint, g: BigUint) -> Result<Self> {
        if p < BigUint::from(7u32) {
            return Err(Error::invalid_group("modulus must be at least 7"));
        }
        let group = Self::from_parts(GroupId::Custom, p, g);

        if group.g < BigUint::from(2u32) || group.g >= group.p_minus_one {
            return Err(Error::invalid_group("generator must lie in [2, p - 2]"));
        }
        if !probably_prime(&group.p, PRIMALITY_ROUNDS) {
            return Err(Error::invalid_group("modulus is not prime"));
        }
        if !probably_prime(&group.q, PRIMALITY_ROUNDS) {
            return Err(Error::invalid_group("modulus is not a safe prime"));
        }
        if !group.g.modpow(&group.q, &group.p).is_one() {
            return Err(Error::invalid_group(
                "generator does not lie in the prime-order subgroup",
            ));
        }

        debug!("accepted custom {}-bit group", group.bits());
        Ok(group)
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The prime modulus `p`.
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// The generator `g`.
    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// The subgroup order `q = (p - 1) / 2`.
    pub fn q(&self) -> &BigUint {
        &self.q
    }

    pub fn bits(&self) -> usize {
        self.p.bits()
    }

    /// Width of the canonical encoding of a group element.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Returns true iff `2 < candidate < p - 1` and `candidate` is a
    /// quadratic residue mod `p`, i.e. a member of the order-`q` subgroup.
    pub fn validate_public_value(&self, candidate: &BigUint) -> bool {
        if *candidate <= BigUint::from(2u32) || *candidate >= self.p_minus_one {
            return false;
        }
        candidate.modpow(&self.q, &self.p).is_one()
    }

    /// Fixed-width big-endian encoding of an element of `[0, p)`.
    ///
    /// # Errors
    /// * `Error::InvalidEncoding` if `value >= p`.
    pub fn encode(&self, value: &BigUint) -> Result<Vec<u8>> {
        if *value >= self.p {
            return Err(Error::invalid_encoding("value is not reduced mod p"));
        }
        Ok(to_fixed_width(value, self.byte_len))
    }

    /// Parses a fixed-width big-endian element. No range or subgroup
    /// check is performed here.
    pub fn decode(&self, bytes: &[u8]) -> Result<BigUint> {
        if bytes.len() != self.byte_len {
            return Err(Error::invalid_encoding(format!(
                "expected {} bytes, got {}",
                self.byte_len,
                bytes.len()
            )));
        }
        Ok(BigUint::from_bytes_be(bytes))
    }

    /// Like [`ModpGroup::decode`], from a hex string.
    pub fn decode_hex(&self, encoded: &str) -> Result<BigUint> {
        let bytes =
            hex::decode(encoded.trim()).map_err(|e| Error::invalid_encoding(e.to_string()))?;
        self.decode(&bytes)
    }
}

impl fmt::Debug for ModpGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModpGroup")
            .field("id", &self.id)
            .field("bits", &self.bits())
            .field("g", &self.g)
            .finish()
    }
}

/// Left-pads the big-endian bytes of `value` to `width`.
pub(crate) fn to_fixed_width(value: &BigUint, width: usize) -> Vec<u8> {
    let raw = value.to_bytes_be();
    debug_assert!(raw.len() <= width);
    let mut out = vec![0u8; width.saturating_sub(raw.len())];
    out.extend_from_slice(&raw);
    out
}

// RFC 3526 group 5, 1536-bit prime.
const MODP_1536_P: &str = "\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA237327FFFFFFFFFFFFFFFF";

// RFC 3526 group 14, 2048-bit prime.
const MODP_2048_P: &str = "\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

// RFC 3526 group 15, 3072-bit prime.
const MODP_3072_P: &str = "\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D04507A33\
A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7\
ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864\
D87602733EC86A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E2\
08E24FA074E5AB3143DB5BFCE0FD108E4B82D120A93AD2CAFFFFFFFFFFFFFFFF";

// RFC 3526 group 16, 4096-bit prime.
const MODP_4096_P: &str = "\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D04507A33\
A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7\
ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864\
D87602733EC86A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E2\
08E24FA074E5AB3143DB5BFCE0FD108E4B82D120A92108011A723C12A787E6D7\
88719A10BDBA5B2699C327186AF4E23C1A946834B6150BDA2583E9CA2AD44CE8\
DBBBC2DB04DE8EF92E8EFC141FBECAA6287C59474E6BC05D99B2964FA090C3A2\
233BA186515BE7ED1F612970CEE2D7AFB81BDD762170481CD0069127D5B05AA9\
93B4EA988D8FDDC186FFB7DC90A6C08F4DF435C934063199FFFFFFFFFFFFFFFF";

// RFC 3526 group 17, 6144-bit prime.
const MODP_6144_P: &str = "\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D04507A33\
A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7\
ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864\
D87602733EC86A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E2\
08E24FA074E5AB3143DB5BFCE0FD108E4B82D120A92108011A723C12A787E6D7\
88719A10BDBA5B2699C327186AF4E23C1A946834B6150BDA2583E9CA2AD44CE8\
DBBBC2DB04DE8EF92E8EFC141FBECAA6287C59474E6BC05D99B2964FA090C3A2\
233BA186515BE7ED1F612970CEE2D7AFB81BDD762170481CD0069127D5B05AA9\
93B4EA988D8FDDC186FFB7DC90A6C08F4DF435C93402849236C3FAB4D27C7026\
C1D4DCB2602646DEC9751E763DBA37BDF8FF9406AD9E530EE5DB382F413001AE\
B06A53ED9027D831179727B0865A8918DA3EDBEBCF9B14ED44CE6CBACED4BB1B\
DB7F1447E6CC254B332051512BD7AF426FB8F401378CD2BF5983CA01C64B92EC\
F032EA15D1721D03F482D7CE6E74FEF6D55E702F46980C82B5A84031900B1C9E\
59E7C97FBEC7E8F323A97A7E36CC88BE0F1D45B7FF585AC54BD407B22B4154AA\
CC8F6D7EBF48E1D814CC5ED20F8037E0A79715EEF29BE32806A1D58BB7C5DA76\
F550AA3D8A1FBFF0EB19CCB1A313D55CDA56C9EC2EF29632387FE8D76E3C0468\
043E8F663F4860EE12BF2D5B0B7474D6E694F91E6DCC4024FFFFFFFFFFFFFFFF";

// RFC 3526 group 18, 8192-bit prime.
const MODP_8192_P: &str = "\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D04507A33\
A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7\
ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864\
D87602733EC86A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E2\
08E24FA074E5AB3143DB5BFCE0FD108E4B82D120A92108011A723C12A787E6D7\
88719A10BDBA5B2699C327186AF4E23C1A946834B6150BDA2583E9CA2AD44CE8\
DBBBC2DB04DE8EF92E8EFC141FBECAA6287C59474E6BC05D99B2964FA090C3A2\
233BA186515BE7ED1F612970CEE2D7AFB81BDD762170481CD0069127D5B05AA9\
93B4EA988D8FDDC186FFB7DC90A6C08F4DF435C93402849236C3FAB4D27C7026\
C1D4DCB2602646DEC9751E763DBA37BDF8FF9406AD9E530EE5DB382F413001AE\
B06A53ED9027D831179727B0865A8918DA3EDBEBCF9B14ED44CE6CBACED4BB1B\
DB7F1447E6CC254B332051512BD7AF426FB8F401378CD2BF5983CA01C64B92EC\
F032EA15D1721D03F482D7CE6E74FEF6D55E702F46980C82B5A84031900B1C9E\
59E7C97FBEC7E8F323A97A7E36CC88BE0F1D45B7FF585AC54BD407B22B4154AA\
CC8F6D7EBF48E1D814CC5ED20F8037E0A79715EEF29BE32806A1D58BB7C5DA76\
F550AA3D8A1FBFF0EB19CCB1A313D55CDA56C9EC2EF29632387FE8D76E3C0468\
043E8F663F4860EE12BF2D5B0B7474D6E694F91E6DBE115974A3926F12FEE5E4\
38777CB6A932DF8CD8BEC4D073B931BA3BC832B68D9DD300741FA7BF8AFC47ED\
2576F6936BA424663AAB639C5AE4F5683423B4742BF1C978238F16CBE39D652D\
E3FDB8BEFC848AD922222E04A4037C0713EB57A81A23F0C73473FC646CEA306B\
4BCBC8862F8385DDFA9D4B7FA2C087E879683303ED5BDD3A062B3CF5B3A278A6\
6D2A13F83F44F82DDF310EE074AB6A364597E899A0255DC164F31CC50846851D\
F9AB48195DED7EA1B1D510BD7EE74D73FAF36BC31ECFA268359046F4EB879F92\
4009438B481C6CD7889A002ED5EE382BC9190DA6FC026E479558E4475677E9AA\
9E3050E2765694DFC81F56E880B96E7160C980DD98EDD3DFFFFFFFFFFFFFFFFF";
