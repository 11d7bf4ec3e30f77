/// Group channels the time subsystem listens and publishes on.
///
/// In combined configurations the full timestamp travels on [`DateTime`]
/// (DPT 19); in split configurations [`Time`] (DPT 10) and [`Date`] (DPT 11)
/// carry the fragments separately. [`DstSwitch`] (DPT 1) carries the
/// daylight-saving flag when a separate switch object is the authority.
///
/// [`DateTime`]: GroupChannel::DateTime
/// [`Time`]: GroupChannel::Time
/// [`Date`]: GroupChannel::Date
/// [`DstSwitch`]: GroupChannel::DstSwitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupChannel {
    Time,
    Date,
    DateTime,
    DstSwitch,
}

/// One inbound group telegram: channel plus raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    pub channel: GroupChannel,
    pub payload: Vec<u8>,
}

impl Telegram {
    pub fn new(channel: GroupChannel, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }
}

/// Outbound surface of the KNX group bus, implemented by the transport layer.
pub trait GroupBus {
    /// Asks bus peers for the current value of a group object.
    fn request_read(&mut self, channel: GroupChannel);

    /// Refreshes the group value so reads see fresh data, without
    /// transmitting.
    fn update(&mut self, channel: GroupChannel, payload: &[u8]);

    /// Transmits a group value onto the bus.
    fn publish(&mut self, channel: GroupChannel, payload: &[u8]);
}
