//! Calls to the permission contract.
//!
//! Call data is a 4-byte selector (the [`method_id`] of the method signature)
//! followed by the arguments as one CBOR array.
//!
//! | method                                                  | arguments                               |
//! |---------------------------------------------------------|-----------------------------------------|
//! | `grantPermission(address,address,address,uint256)`      | contract, member, group, capability code |
//! | `revokePermission(address,address,address,uint256)`     | contract, member, group, capability code |
//! | `createGroupPermission(string)`                         | group name                              |
//! | `delGroupPermission(address)`                           | group                                   |
//! | `addCaCert(bytes)`                                      | certificate (PEM or DER)                |
//! | `delCaCert(address)`                                    | certificate holder                      |

use ciborium::value::Value;

use permchain_core::{method_id, Address};
use permchain_perms::{Capability, Scope};

use crate::error::{ChainError, Result};

const GRANT: &str = "grantPermission(address,address,address,uint256)";
const REVOKE: &str = "revokePermission(address,address,address,uint256)";
const CREATE_GROUP: &str = "createGroupPermission(string)";
const DEL_GROUP: &str = "delGroupPermission(address)";
const ADD_CERT: &str = "addCaCert(bytes)";
const DEL_CERT: &str = "delCaCert(address)";

/// A decoded permission contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCall {
    Grant {
        contract: Address,
        member: Address,
        group: Address,
        capability: Capability,
    },
    Revoke {
        contract: Address,
        member: Address,
        group: Address,
        capability: Capability,
    },
    CreateGroup {
        name: String,
    },
    DeleteGroup {
        group: Address,
    },
    AddCertificate {
        certificate: Vec<u8>,
    },
    RemoveCertificate {
        holder: Address,
    },
}

/// What the caller of a permission call must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub capability: Capability,
    pub scope: Scope,
}

impl Requirement {
    pub fn new(capability: Capability, scope: Scope) -> Self {
        Self { capability, scope }
    }

    /// The group field of the check, zero outside group scope.
    pub fn group(&self) -> Address {
        match self.scope {
            Scope::Group(group) => group,
            _ => Address::ZERO,
        }
    }

    /// The contract field of the check, zero outside contract scope.
    pub fn contract(&self) -> Address {
        match self.scope {
            Scope::Contract(contract) => contract,
            _ => Address::ZERO,
        }
    }
}

impl PermissionCall {
    /// The method signature this call is selected by.
    pub fn signature(&self) -> &'static str {
        match self {
            PermissionCall::Grant { .. } => GRANT,
            PermissionCall::Revoke { .. } => REVOKE,
            PermissionCall::CreateGroup { .. } => CREATE_GROUP,
            PermissionCall::DeleteGroup { .. } => DEL_GROUP,
            PermissionCall::AddCertificate { .. } => ADD_CERT,
            PermissionCall::RemoveCertificate { .. } => DEL_CERT,
        }
    }

    /// Encode as call data.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let args = match self {
            PermissionCall::Grant {
                contract,
                member,
                group,
                capability,
            }
            | PermissionCall::Revoke {
                contract,
                member,
                group,
                capability,
            } => vec![
                address_value(contract),
                address_value(member),
                address_value(group),
                Value::Integer(capability.code().into()),
            ],
            PermissionCall::CreateGroup { name } => vec![Value::Text(name.clone())],
            PermissionCall::DeleteGroup { group } => vec![address_value(group)],
            PermissionCall::AddCertificate { certificate } => {
                vec![Value::Bytes(certificate.clone())]
            }
            PermissionCall::RemoveCertificate { holder } => vec![address_value(holder)],
        };

        let mut data = method_id(self.signature()).to_vec();
        ciborium::into_writer(&Value::Array(args), &mut data)
            .map_err(|e| ChainError::Encoding(e.to_string()))?;
        Ok(data)
    }

    /// Decode call data.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(malformed(format!("call data has {} bytes", data.len())));
        }
        let (selector, mut body) = data.split_at(4);

        let value: Value = ciborium::from_reader(&mut body)
            .map_err(|e| malformed(format!("arguments: {e}")))?;
        if !body.is_empty() {
            return Err(malformed(format!("{} bytes after arguments", body.len())));
        }
        let Value::Array(args) = value else {
            return Err(malformed("arguments are not an array"));
        };
        let mut args = Args::new(args);

        let call = if selector == method_id(GRANT) || selector == method_id(REVOKE) {
            let contract = args.address()?;
            let member = args.address()?;
            let group = args.address()?;
            let capability = args.capability()?;
            if selector == method_id(GRANT) {
                PermissionCall::Grant {
                    contract,
                    member,
                    group,
                    capability,
                }
            } else {
                PermissionCall::Revoke {
                    contract,
                    member,
                    group,
                    capability,
                }
            }
        } else if selector == method_id(CREATE_GROUP) {
            PermissionCall::CreateGroup { name: args.text()? }
        } else if selector == method_id(DEL_GROUP) {
            PermissionCall::DeleteGroup {
                group: args.address()?,
            }
        } else if selector == method_id(ADD_CERT) {
            PermissionCall::AddCertificate {
                certificate: args.bytes()?,
            }
        } else if selector == method_id(DEL_CERT) {
            PermissionCall::RemoveCertificate {
                holder: args.address()?,
            }
        } else {
            return Err(malformed(format!("unknown selector 0x{}", hex::encode(selector))));
        };

        args.finish()?;
        Ok(call)
    }

    /// The capability and scope the caller must hold.
    ///
    /// Fails for a grant of a non-`Add` kind, a revoke of a non-`Del` kind,
    /// capabilities that do not map to a table role, and grants naming both
    /// a group and a contract.
    pub fn requirement(&self) -> Result<Requirement> {
        let requirement = match self {
            PermissionCall::Grant {
                contract,
                group,
                capability,
                ..
            } => {
                if !capability.is_add() || capability.target_role().is_none() {
                    return Err(malformed(format!("{capability} cannot be granted")));
                }
                Requirement::new(*capability, call_scope(group, contract)?)
            }
            PermissionCall::Revoke {
                contract,
                group,
                capability,
                ..
            } => {
                if !capability.is_del() || capability.target_role().is_none() {
                    return Err(malformed(format!("{capability} cannot be revoked")));
                }
                Requirement::new(*capability, call_scope(group, contract)?)
            }
            PermissionCall::CreateGroup { name } => {
                if name.is_empty() {
                    return Err(malformed("empty group name"));
                }
                Requirement::new(Capability::CreateGroup, Scope::Global)
            }
            PermissionCall::DeleteGroup { group } => {
                if group.is_zero() {
                    return Err(malformed("zero group address"));
                }
                Requirement::new(Capability::DelGroup, Scope::Group(*group))
            }
            PermissionCall::AddCertificate { .. } => {
                Requirement::new(Capability::AddCertPerm, Scope::Global)
            }
            PermissionCall::RemoveCertificate { .. } => {
                Requirement::new(Capability::DelCertPerm, Scope::Global)
            }
        };
        Ok(requirement)
    }
}

fn call_scope(group: &Address, contract: &Address) -> Result<Scope> {
    Scope::from_fields(group, contract)
        .ok_or_else(|| malformed("both group and contract are set"))
}

fn address_value(addr: &Address) -> Value {
    Value::Bytes(addr.as_bytes().to_vec())
}

fn malformed(reason: impl Into<String>) -> ChainError {
    ChainError::MalformedCall(reason.into())
}

/// Positional argument reader.
struct Args {
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Args {
    fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    fn next(&mut self) -> Result<Value> {
        self.position += 1;
        self.values
            .next()
            .ok_or_else(|| malformed(format!("missing argument {}", self.position)))
    }

    fn address(&mut self) -> Result<Address> {
        let bytes = self.bytes()?;
        Address::try_from(bytes.as_slice())
            .map_err(|_| malformed(format!("argument {} is not an address", self.position)))
    }

    fn bytes(&mut self) -> Result<Vec<u8>> {
        match self.next()? {
            Value::Bytes(bytes) => Ok(bytes),
            _ => Err(malformed(format!("argument {} is not bytes", self.position))),
        }
    }

    fn text(&mut self) -> Result<String> {
        match self.next()? {
            Value::Text(text) => Ok(text),
            _ => Err(malformed(format!("argument {} is not text", self.position))),
        }
    }

    fn capability(&mut self) -> Result<Capability> {
        let position = self.position + 1;
        let code = match self.next()? {
            Value::Integer(code) => u16::try_from(code).ok(),
            _ => None,
        };
        code.and_then(Capability::from_code)
            .ok_or_else(|| malformed(format!("argument {position} is not a capability code")))
    }

    fn finish(mut self) -> Result<()> {
        if self.values.next().is_some() {
            return Err(malformed("trailing arguments"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn sample_calls() -> Vec<PermissionCall> {
        vec![
            PermissionCall::Grant {
                contract: Address::ZERO,
                member: addr(1),
                group: Address::ZERO,
                capability: Capability::AddSendTxPerm,
            },
            PermissionCall::Revoke {
                contract: addr(0xc0),
                member: addr(1),
                group: Address::ZERO,
                capability: Capability::DelContractMemberPerm,
            },
            PermissionCall::CreateGroup { name: "ops".into() },
            PermissionCall::DeleteGroup { group: addr(0x90) },
            PermissionCall::AddCertificate {
                certificate: b"-----BEGIN CERTIFICATE-----".to_vec(),
            },
            PermissionCall::RemoveCertificate { holder: addr(3) },
        ]
    }

    #[test]
    fn test_encode_decode() {
        for call in sample_calls() {
            let data = call.encode().unwrap();
            assert_eq!(&data[..4], &method_id(call.signature())[..]);
            assert_eq!(PermissionCall::decode(&data).unwrap(), call);
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let good = sample_calls()[0].encode().unwrap();

        let mut unknown = good.clone();
        unknown[0] ^= 0xff;
        let too_short = good[..3].to_vec();
        let truncated = good[..good.len() - 1].to_vec();
        let mut wrong_shape = method_id(GRANT).to_vec();
        ciborium::into_writer(&Value::Text("x".into()), &mut wrong_shape).unwrap();
        let mut short_address = method_id(DEL_GROUP).to_vec();
        ciborium::into_writer(&Value::Array(vec![Value::Bytes(vec![1; 19])]), &mut short_address)
            .unwrap();
        let mut trailing = method_id(DEL_GROUP).to_vec();
        ciborium::into_writer(
            &Value::Array(vec![address_value(&addr(1)), Value::Null]),
            &mut trailing,
        )
        .unwrap();
        let mut bad_code = method_id(GRANT).to_vec();
        ciborium::into_writer(
            &Value::Array(vec![
                address_value(&Address::ZERO),
                address_value(&addr(1)),
                address_value(&Address::ZERO),
                Value::Integer(4u16.into()),
            ]),
            &mut bad_code,
        )
        .unwrap();

        for data in [unknown, too_short, truncated, wrong_shape, short_address, trailing, bad_code] {
            assert!(
                matches!(PermissionCall::decode(&data), Err(ChainError::MalformedCall(_))),
                "{}",
                hex::encode(&data)
            );
        }
    }

    #[test]
    fn test_decode_rejects_bytes_after_arguments() {
        for call in sample_calls() {
            let mut data = call.encode().unwrap();
            data.extend_from_slice(&[0xde, 0xad]);
            match PermissionCall::decode(&data) {
                Err(ChainError::MalformedCall(reason)) => {
                    assert!(reason.contains("2 bytes after arguments"), "{reason}")
                }
                other => panic!("{call:?} decoded with trailing bytes: {other:?}"),
            }
        }
    }

    #[test]
    fn test_requirements() {
        let calls = sample_calls();
        assert_eq!(
            calls[0].requirement().unwrap(),
            Requirement::new(Capability::AddSendTxPerm, Scope::Global)
        );
        assert_eq!(
            calls[1].requirement().unwrap(),
            Requirement::new(Capability::DelContractMemberPerm, Scope::Contract(addr(0xc0)))
        );
        assert_eq!(calls[2].requirement().unwrap().capability, Capability::CreateGroup);
        assert_eq!(
            calls[3].requirement().unwrap(),
            Requirement::new(Capability::DelGroup, Scope::Group(addr(0x90)))
        );
        assert_eq!(calls[4].requirement().unwrap().capability, Capability::AddCertPerm);
        assert_eq!(calls[5].requirement().unwrap().capability, Capability::DelCertPerm);

        let req = calls[3].requirement().unwrap();
        assert_eq!(req.group(), addr(0x90));
        assert!(req.contract().is_zero());
    }

    #[test]
    fn test_requirement_rejects_direction_mismatch() {
        let grant_del = PermissionCall::Grant {
            contract: Address::ZERO,
            member: addr(1),
            group: Address::ZERO,
            capability: Capability::DelSendTxPerm,
        };
        let revoke_add = PermissionCall::Revoke {
            contract: Address::ZERO,
            member: addr(1),
            group: Address::ZERO,
            capability: Capability::AddSendTxPerm,
        };
        let grant_cert = PermissionCall::Grant {
            contract: Address::ZERO,
            member: addr(1),
            group: Address::ZERO,
            capability: Capability::AddCertPerm,
        };
        let both_scopes = PermissionCall::Grant {
            contract: addr(0xc0),
            member: addr(1),
            group: addr(0x90),
            capability: Capability::AddGroupMemberPerm,
        };
        for call in [grant_del, revoke_add, grant_cert, both_scopes] {
            assert!(matches!(call.requirement(), Err(ChainError::MalformedCall(_))));
        }
    }
}
