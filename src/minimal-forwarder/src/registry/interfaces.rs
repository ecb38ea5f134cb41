//! Solidity ABI of the identity registry.
//!
//! Relayers build calldata with these bindings and decode revert payloads with
//! [`IDIDRegistry::IDIDRegistryErrors`].

use alloy_sol_types::sol;

sol! {
    interface IDIDRegistry {
        struct DIDRecord {
            address owner;
            string metadata;
            uint256 createdAt;
            uint256 updatedAt;
        }

        error DuplicateIdentifier(string did);
        error IdentifierNotFound(string did);
        error NotIdentifierOwner(string did, address caller);
        error EmptyIdentifier();
        error NonPayable(uint256 value);
        error OutOfGas(uint256 required, uint256 provided);
        error MalformedCall(bytes4 selector);

        function registerDID(string did, string metadata) external;
        function updateDID(string did, string metadata) external;
        function getDID(string did) external view returns (DIDRecord record);
        function isTrustedForwarder(address forwarder) external view returns (bool trusted);
    }
}
