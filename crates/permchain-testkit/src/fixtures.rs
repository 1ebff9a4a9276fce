//! Test fixtures and helpers.
//!
//! Certificates come from `rcgen`, which issues P-256 certificates only, so
//! certified identities and [`TestChain`] use the standard suite.

use p256::pkcs8::DecodePrivateKey;

use permchain::{
    Admission, Applied, Chain, ChainConfig, Genesis, Outcome, PermissionCall, Result, Transaction,
};
use permchain_cim::CommitteeMember;
use permchain_core::{
    crypto_suite, Address, CryptoSuite, KeyCodec, PrivateKey, PublicKey, SuiteKind,
    PERMISSION_CONTRACT_ADDRESS,
};
use permchain_store::MemoryState;

/// A key pair, its address, and (for certified identities) a certificate.
#[derive(Debug, Clone)]
pub struct Identity {
    pub key: PrivateKey,
    pub public_key: PublicKey,
    pub address: Address,
    /// PEM certificate for the key, if one was issued.
    pub certificate: Option<String>,
}

impl Identity {
    /// A fresh standard-suite key with a self-signed certificate.
    pub fn certified() -> Self {
        let suite = crypto_suite(SuiteKind::Standard);
        let key_pair = rcgen::KeyPair::generate().expect("generate P-256 key");
        let cert = rcgen::CertificateParams::new(vec!["node.permchain".to_string()])
            .expect("certificate params")
            .self_signed(&key_pair)
            .expect("self-sign certificate");

        let secret = p256::SecretKey::from_pkcs8_der(&key_pair.serialize_der())
            .expect("rcgen emits PKCS#8");
        let key = suite
            .deserialize_private(secret.to_bytes().as_slice())
            .expect("valid P-256 scalar");

        let mut identity = Self::from_key(suite.as_ref(), key);
        identity.certificate = Some(cert.pem());
        identity
    }

    /// A fresh key under `kind` with no certificate.
    pub fn uncertified(kind: SuiteKind) -> Self {
        let suite = crypto_suite(kind);
        let key = suite.generate_key().expect("generate key");
        Self::from_key(suite.as_ref(), key)
    }

    fn from_key(suite: &dyn CryptoSuite, key: PrivateKey) -> Self {
        let public_key = suite.public_key_of(&key).expect("public key");
        let address = suite.address_of(&public_key).expect("address");
        Self {
            key,
            public_key,
            address,
            certificate: None,
        }
    }

    /// This identity as a committee member.
    pub fn committee_member(&self) -> CommitteeMember {
        CommitteeMember {
            address: self.address,
            public_key: self.public_key,
        }
    }

    /// The certificate bytes. Panics for uncertified identities.
    pub fn certificate_bytes(&self) -> Vec<u8> {
        self.certificate
            .clone()
            .expect("identity has no certificate")
            .into_bytes()
    }
}

/// A chain on in-memory state, committed at block 0.
pub struct TestChain {
    pub chain: Chain,
    pub state: MemoryState,
    /// Committee members, each holding the root and manager roles.
    pub committee: Vec<Identity>,
    /// Identities with a genesis certificate but no roles.
    pub users: Vec<Identity>,
    /// Height the next applied transaction lands at.
    pub height: u64,
    next_nonce: u64,
}

impl TestChain {
    /// A permission-enforcing chain with `committee` members and `users`
    /// certified non-members.
    pub fn new(committee: usize, users: usize) -> Self {
        Self::with_config(ChainConfig::default(), committee, users)
    }

    /// Like [`Self::new`] with an explicit configuration.
    pub fn with_config(config: ChainConfig, committee: usize, users: usize) -> Self {
        let committee: Vec<Identity> = (0..committee).map(|_| Identity::certified()).collect();
        let users: Vec<Identity> = (0..users).map(|_| Identity::certified()).collect();

        let genesis = Genesis {
            config,
            committee: committee.iter().map(Identity::committee_member).collect(),
            certificates: committee
                .iter()
                .chain(users.iter())
                .map(Identity::certificate_bytes)
                .collect(),
        };

        let chain = Chain::new(genesis);
        let state = MemoryState::new();
        chain.commit_genesis(&state, 0).expect("commit genesis");

        Self {
            chain,
            state,
            committee,
            users,
            height: 1,
            next_nonce: 0,
        }
    }

    /// The chain's suite.
    pub fn suite(&self) -> &dyn CryptoSuite {
        self.chain.suite().as_ref()
    }

    /// Sign `tx` as `from`, giving it a fresh nonce.
    pub fn sign(&mut self, from: &Identity, mut tx: Transaction) -> Transaction {
        tx.nonce = self.next_nonce;
        self.next_nonce += 1;
        self.chain
            .tx_signer()
            .sign(self.chain.suite().as_ref(), &mut tx, &from.key)
            .expect("sign transaction");
        tx
    }

    /// A signed transfer.
    pub fn transfer(&mut self, from: &Identity, to: Address) -> Transaction {
        self.sign(from, Transaction::transfer(0, to, 1))
    }

    /// A signed contract creation.
    pub fn create_contract(&mut self, from: &Identity) -> Transaction {
        self.sign(from, Transaction::create(0, vec![0x60, 0x80]))
    }

    /// A signed call to a contract.
    pub fn call_contract(&mut self, from: &Identity, contract: Address) -> Transaction {
        self.sign(from, Transaction::call(0, contract, vec![0x01]))
    }

    /// A signed permission call.
    pub fn permission_call(&mut self, from: &Identity, call: &PermissionCall) -> Transaction {
        let data = call.encode().expect("encode permission call");
        self.sign(from, Transaction::call(0, PERMISSION_CONTRACT_ADDRESS, data))
    }

    /// Pool admission against the current state.
    pub fn admit(&self, tx: &Transaction) -> Result<Admission> {
        self.chain.admit_pending(tx, &self.state)
    }

    /// Include `tx` at the current height and advance it.
    pub fn apply(&mut self, tx: &Transaction) -> Result<Outcome> {
        let outcome = self.chain.apply_transaction(tx, self.height, &self.state);
        self.height += 1;
        outcome
    }

    /// Sign and apply a permission call, panicking if it fails.
    pub fn execute(&mut self, from: &Identity, call: PermissionCall) -> Applied {
        let tx = self.permission_call(from, &call);
        self.apply(&tx).expect("permission call").applied
    }

    /// Create a contract as `from` and return its address.
    pub fn deploy(&mut self, from: &Identity) -> Address {
        let tx = self.create_contract(from);
        match self.apply(&tx).expect("contract creation").applied {
            Applied::ContractCreated(address) => address,
            other => panic!("expected a contract creation, got {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certified_identity_matches_certificate() {
        let identity = Identity::certified();
        let suite = crypto_suite(SuiteKind::Standard);
        let cert = permchain_cim::Certificate::parse(suite.as_ref(), &identity.certificate_bytes())
            .unwrap();
        assert_eq!(cert.address(), &identity.address);
        assert_eq!(cert.public_key(), &identity.public_key);
    }

    #[test]
    fn test_chain_starts_committed() {
        let chain = TestChain::new(2, 1);
        assert_eq!(
            permchain_cim::initialized_at(&chain.state).unwrap(),
            Some(0)
        );
        assert_eq!(chain.height, 1);
    }

    #[test]
    fn test_nonces_are_unique() {
        let mut chain = TestChain::new(1, 0);
        let member = chain.committee[0].clone();
        let a = chain.transfer(&member, Address::ZERO);
        let b = chain.transfer(&member, Address::ZERO);
        assert_ne!(a.nonce, b.nonce);
    }
}
