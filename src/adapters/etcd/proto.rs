//! Protobuf encoding for the etcd watch and lease messages.
//!
//! Manual `prost::Message` implementations for the subset of
//! `etcdserverpb`/`mvccpb` the expiry watch needs, so no proto codegen runs
//! at build time. Field numbers follow etcd v3.5 `rpc.proto` and `kv.proto`.

use prost::{DecodeError, Message};

/// `mvccpb.Event.EventType.PUT`.
pub const EVENT_TYPE_PUT: i32 = 0;
/// `mvccpb.Event.EventType.DELETE`.
pub const EVENT_TYPE_DELETE: i32 = 1;

/// `WatchCreateRequest.FilterType.NOPUT`.
pub const FILTER_NOPUT: i32 = 0;
/// `WatchCreateRequest.FilterType.NODELETE`.
pub const FILTER_NODELETE: i32 = 1;

// ============================================================================
// ResponseHeader
// ============================================================================

/// Wire-format ResponseHeader matching etcd's etcdserverpb.ResponseHeader.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct ResponseHeader {
    pub cluster_id: u64, // field 1
    pub member_id: u64,  // field 2
    pub revision: i64,   // field 3
    pub raft_term: u64,  // field 4
}

impl Message for ResponseHeader {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if self.cluster_id != 0 {
            prost::encoding::uint64::encode(1, &self.cluster_id, buf);
        }
        if self.member_id != 0 {
            prost::encoding::uint64::encode(2, &self.member_id, buf);
        }
        if self.revision != 0 {
            prost::encoding::int64::encode(3, &self.revision, buf);
        }
        if self.raft_term != 0 {
            prost::encoding::uint64::encode(4, &self.raft_term, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => prost::encoding::uint64::merge(wire_type, &mut self.cluster_id, buf, ctx),
            2 => prost::encoding::uint64::merge(wire_type, &mut self.member_id, buf, ctx),
            3 => prost::encoding::int64::merge(wire_type, &mut self.revision, buf, ctx),
            4 => prost::encoding::uint64::merge(wire_type, &mut self.raft_term, buf, ctx),
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if self.cluster_id != 0 {
            len += prost::encoding::uint64::encoded_len(1, &self.cluster_id);
        }
        if self.member_id != 0 {
            len += prost::encoding::uint64::encoded_len(2, &self.member_id);
        }
        if self.revision != 0 {
            len += prost::encoding::int64::encoded_len(3, &self.revision);
        }
        if self.raft_term != 0 {
            len += prost::encoding::uint64::encoded_len(4, &self.raft_term);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// KeyValue
// ============================================================================

/// Wire-format KeyValue matching etcd's mvccpb.KeyValue.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct KeyValue {
    pub key: Vec<u8>,         // field 1
    pub create_revision: i64, // field 2
    pub mod_revision: i64,    // field 3
    pub version: i64,         // field 4
    pub value: Vec<u8>,       // field 5
    pub lease: i64,           // field 6
}

impl Message for KeyValue {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if !self.key.is_empty() {
            prost::encoding::bytes::encode(1, &self.key, buf);
        }
        if self.create_revision != 0 {
            prost::encoding::int64::encode(2, &self.create_revision, buf);
        }
        if self.mod_revision != 0 {
            prost::encoding::int64::encode(3, &self.mod_revision, buf);
        }
        if self.version != 0 {
            prost::encoding::int64::encode(4, &self.version, buf);
        }
        if !self.value.is_empty() {
            prost::encoding::bytes::encode(5, &self.value, buf);
        }
        if self.lease != 0 {
            prost::encoding::int64::encode(6, &self.lease, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => prost::encoding::bytes::merge(wire_type, &mut self.key, buf, ctx),
            2 => prost::encoding::int64::merge(wire_type, &mut self.create_revision, buf, ctx),
            3 => prost::encoding::int64::merge(wire_type, &mut self.mod_revision, buf, ctx),
            4 => prost::encoding::int64::merge(wire_type, &mut self.version, buf, ctx),
            5 => prost::encoding::bytes::merge(wire_type, &mut self.value, buf, ctx),
            6 => prost::encoding::int64::merge(wire_type, &mut self.lease, buf, ctx),
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.key.is_empty() {
            len += prost::encoding::bytes::encoded_len(1, &self.key);
        }
        if self.create_revision != 0 {
            len += prost::encoding::int64::encoded_len(2, &self.create_revision);
        }
        if self.mod_revision != 0 {
            len += prost::encoding::int64::encoded_len(3, &self.mod_revision);
        }
        if self.version != 0 {
            len += prost::encoding::int64::encoded_len(4, &self.version);
        }
        if !self.value.is_empty() {
            len += prost::encoding::bytes::encoded_len(5, &self.value);
        }
        if self.lease != 0 {
            len += prost::encoding::int64::encoded_len(6, &self.lease);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Event
// ============================================================================

/// Wire-format Event matching etcd's mvccpb.Event.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Event {
    pub r#type: i32,               // field 1 (enum)
    pub kv: Option<KeyValue>,      // field 2
    pub prev_kv: Option<KeyValue>, // field 3
}

impl Message for Event {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if self.r#type != 0 {
            prost::encoding::int32::encode(1, &self.r#type, buf);
        }
        if let Some(ref kv) = self.kv {
            prost::encoding::message::encode(2, kv, buf);
        }
        if let Some(ref prev_kv) = self.prev_kv {
            prost::encoding::message::encode(3, prev_kv, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => prost::encoding::int32::merge(wire_type, &mut self.r#type, buf, ctx),
            2 => {
                let mut kv = self.kv.take().unwrap_or_default();
                prost::encoding::message::merge(wire_type, &mut kv, buf, ctx)?;
                self.kv = Some(kv);
                Ok(())
            }
            3 => {
                let mut prev_kv = self.prev_kv.take().unwrap_or_default();
                prost::encoding::message::merge(wire_type, &mut prev_kv, buf, ctx)?;
                self.prev_kv = Some(prev_kv);
                Ok(())
            }
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if self.r#type != 0 {
            len += prost::encoding::int32::encoded_len(1, &self.r#type);
        }
        if let Some(ref kv) = self.kv {
            len += prost::encoding::message::encoded_len(2, kv);
        }
        if let Some(ref prev_kv) = self.prev_kv {
            len += prost::encoding::message::encoded_len(3, prev_kv);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// WatchCreateRequest
// ============================================================================

/// Wire-format WatchCreateRequest matching etcd's etcdserverpb.WatchCreateRequest.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct WatchCreateRequest {
    pub key: Vec<u8>,          // field 1
    pub range_end: Vec<u8>,    // field 2
    pub start_revision: i64,   // field 3
    pub progress_notify: bool, // field 4
    pub filters: Vec<i32>,     // field 5 (repeated enum, packed)
    pub prev_kv: bool,         // field 6
    pub watch_id: i64,         // field 7
    pub fragment: bool,        // field 8
}

impl Message for WatchCreateRequest {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if !self.key.is_empty() {
            prost::encoding::bytes::encode(1, &self.key, buf);
        }
        if !self.range_end.is_empty() {
            prost::encoding::bytes::encode(2, &self.range_end, buf);
        }
        if self.start_revision != 0 {
            prost::encoding::int64::encode(3, &self.start_revision, buf);
        }
        if self.progress_notify {
            prost::encoding::bool::encode(4, &self.progress_notify, buf);
        }
        if !self.filters.is_empty() {
            prost::encoding::int32::encode_packed(5, &self.filters, buf);
        }
        if self.prev_kv {
            prost::encoding::bool::encode(6, &self.prev_kv, buf);
        }
        if self.watch_id != 0 {
            prost::encoding::int64::encode(7, &self.watch_id, buf);
        }
        if self.fragment {
            prost::encoding::bool::encode(8, &self.fragment, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => prost::encoding::bytes::merge(wire_type, &mut self.key, buf, ctx),
            2 => prost::encoding::bytes::merge(wire_type, &mut self.range_end, buf, ctx),
            3 => prost::encoding::int64::merge(wire_type, &mut self.start_revision, buf, ctx),
            4 => prost::encoding::bool::merge(wire_type, &mut self.progress_notify, buf, ctx),
            5 => prost::encoding::int32::merge_repeated(wire_type, &mut self.filters, buf, ctx),
            6 => prost::encoding::bool::merge(wire_type, &mut self.prev_kv, buf, ctx),
            7 => prost::encoding::int64::merge(wire_type, &mut self.watch_id, buf, ctx),
            8 => prost::encoding::bool::merge(wire_type, &mut self.fragment, buf, ctx),
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.key.is_empty() {
            len += prost::encoding::bytes::encoded_len(1, &self.key);
        }
        if !self.range_end.is_empty() {
            len += prost::encoding::bytes::encoded_len(2, &self.range_end);
        }
        if self.start_revision != 0 {
            len += prost::encoding::int64::encoded_len(3, &self.start_revision);
        }
        if self.progress_notify {
            len += prost::encoding::bool::encoded_len(4, &self.progress_notify);
        }
        if !self.filters.is_empty() {
            len += prost::encoding::int32::encoded_len_packed(5, &self.filters);
        }
        if self.prev_kv {
            len += prost::encoding::bool::encoded_len(6, &self.prev_kv);
        }
        if self.watch_id != 0 {
            len += prost::encoding::int64::encoded_len(7, &self.watch_id);
        }
        if self.fragment {
            len += prost::encoding::bool::encoded_len(8, &self.fragment);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// WatchRequest
// ============================================================================

/// Wire-format WatchRequest matching etcd's etcdserverpb.WatchRequest.
///
/// Only the `create_request` member of the `request_union` oneof is
/// modelled; a watch is cancelled by closing the request stream.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct WatchRequest {
    pub create_request: Option<WatchCreateRequest>, // field 1
}

impl WatchRequest {
    /// Wrap a create request.
    pub fn create(request: WatchCreateRequest) -> Self {
        Self {
            create_request: Some(request),
        }
    }
}

impl Message for WatchRequest {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if let Some(ref create) = self.create_request {
            prost::encoding::message::encode(1, create, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => {
                let mut create = self.create_request.take().unwrap_or_default();
                prost::encoding::message::merge(wire_type, &mut create, buf, ctx)?;
                self.create_request = Some(create);
                Ok(())
            }
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        self.create_request
            .as_ref()
            .map_or(0, |create| prost::encoding::message::encoded_len(1, create))
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// WatchResponse
// ============================================================================

/// Wire-format WatchResponse matching etcd's etcdserverpb.WatchResponse.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct WatchResponse {
    pub header: Option<ResponseHeader>, // field 1
    pub watch_id: i64,                  // field 2
    pub created: bool,                  // field 3
    pub canceled: bool,                 // field 4
    pub compact_revision: i64,          // field 5
    pub cancel_reason: String,          // field 6
    pub fragment: bool,                 // field 7
    pub events: Vec<Event>,             // field 11
}

impl Message for WatchResponse {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if let Some(ref header) = self.header {
            prost::encoding::message::encode(1, header, buf);
        }
        if self.watch_id != 0 {
            prost::encoding::int64::encode(2, &self.watch_id, buf);
        }
        if self.created {
            prost::encoding::bool::encode(3, &self.created, buf);
        }
        if self.canceled {
            prost::encoding::bool::encode(4, &self.canceled, buf);
        }
        if self.compact_revision != 0 {
            prost::encoding::int64::encode(5, &self.compact_revision, buf);
        }
        if !self.cancel_reason.is_empty() {
            prost::encoding::string::encode(6, &self.cancel_reason, buf);
        }
        if self.fragment {
            prost::encoding::bool::encode(7, &self.fragment, buf);
        }
        for event in &self.events {
            prost::encoding::message::encode(11, event, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => {
                let mut header = self.header.take().unwrap_or_default();
                prost::encoding::message::merge(wire_type, &mut header, buf, ctx)?;
                self.header = Some(header);
                Ok(())
            }
            2 => prost::encoding::int64::merge(wire_type, &mut self.watch_id, buf, ctx),
            3 => prost::encoding::bool::merge(wire_type, &mut self.created, buf, ctx),
            4 => prost::encoding::bool::merge(wire_type, &mut self.canceled, buf, ctx),
            5 => prost::encoding::int64::merge(wire_type, &mut self.compact_revision, buf, ctx),
            6 => prost::encoding::string::merge(wire_type, &mut self.cancel_reason, buf, ctx),
            7 => prost::encoding::bool::merge(wire_type, &mut self.fragment, buf, ctx),
            11 => {
                let mut event = Event::default();
                prost::encoding::message::merge(wire_type, &mut event, buf, ctx)?;
                self.events.push(event);
                Ok(())
            }
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if let Some(ref header) = self.header {
            len += prost::encoding::message::encoded_len(1, header);
        }
        if self.watch_id != 0 {
            len += prost::encoding::int64::encoded_len(2, &self.watch_id);
        }
        if self.created {
            len += prost::encoding::bool::encoded_len(3, &self.created);
        }
        if self.canceled {
            len += prost::encoding::bool::encoded_len(4, &self.canceled);
        }
        if self.compact_revision != 0 {
            len += prost::encoding::int64::encoded_len(5, &self.compact_revision);
        }
        if !self.cancel_reason.is_empty() {
            len += prost::encoding::string::encoded_len(6, &self.cancel_reason);
        }
        if self.fragment {
            len += prost::encoding::bool::encoded_len(7, &self.fragment);
        }
        for event in &self.events {
            len += prost::encoding::message::encoded_len(11, event);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// LeaseTimeToLiveRequest
// ============================================================================

/// Wire-format LeaseTimeToLiveRequest matching etcd's etcdserverpb.LeaseTimeToLiveRequest.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct LeaseTimeToLiveRequest {
    pub id: i64,    // field 1
    pub keys: bool, // field 2
}

impl Message for LeaseTimeToLiveRequest {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if self.id != 0 {
            prost::encoding::int64::encode(1, &self.id, buf);
        }
        if self.keys {
            prost::encoding::bool::encode(2, &self.keys, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => prost::encoding::int64::merge(wire_type, &mut self.id, buf, ctx),
            2 => prost::encoding::bool::merge(wire_type, &mut self.keys, buf, ctx),
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if self.id != 0 {
            len += prost::encoding::int64::encoded_len(1, &self.id);
        }
        if self.keys {
            len += prost::encoding::bool::encoded_len(2, &self.keys);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// LeaseTimeToLiveResponse
// ============================================================================

/// Wire-format LeaseTimeToLiveResponse matching etcd's etcdserverpb.LeaseTimeToLiveResponse.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct LeaseTimeToLiveResponse {
    pub header: Option<ResponseHeader>, // field 1
    pub id: i64,                        // field 2
    pub ttl: i64,                       // field 3
    pub granted_ttl: i64,               // field 4
    pub keys: Vec<Vec<u8>>,             // field 5
}

impl Message for LeaseTimeToLiveResponse {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if let Some(ref header) = self.header {
            prost::encoding::message::encode(1, header, buf);
        }
        if self.id != 0 {
            prost::encoding::int64::encode(2, &self.id, buf);
        }
        if self.ttl != 0 {
            prost::encoding::int64::encode(3, &self.ttl, buf);
        }
        if self.granted_ttl != 0 {
            prost::encoding::int64::encode(4, &self.granted_ttl, buf);
        }
        for key in &self.keys {
            prost::encoding::bytes::encode(5, key, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => {
                let mut header = self.header.take().unwrap_or_default();
                prost::encoding::message::merge(wire_type, &mut header, buf, ctx)?;
                self.header = Some(header);
                Ok(())
            }
            2 => prost::encoding::int64::merge(wire_type, &mut self.id, buf, ctx),
            3 => prost::encoding::int64::merge(wire_type, &mut self.ttl, buf, ctx),
            4 => prost::encoding::int64::merge(wire_type, &mut self.granted_ttl, buf, ctx),
            5 => {
                let mut key = Vec::new();
                prost::encoding::bytes::merge(wire_type, &mut key, buf, ctx)?;
                self.keys.push(key);
                Ok(())
            }
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if let Some(ref header) = self.header {
            len += prost::encoding::message::encoded_len(1, header);
        }
        if self.id != 0 {
            len += prost::encoding::int64::encoded_len(2, &self.id);
        }
        if self.ttl != 0 {
            len += prost::encoding::int64::encoded_len(3, &self.ttl);
        }
        if self.granted_ttl != 0 {
            len += prost::encoding::int64::encoded_len(4, &self.granted_ttl);
        }
        for key in &self.keys {
            len += prost::encoding::bytes::encoded_len(5, key);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}
