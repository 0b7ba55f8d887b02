// redis 키타입 정의

//actor_stats => actor_stats:{actor_id}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    ActorStats,
}

impl KeyType {
    pub fn get_key(&self, id: &str) -> String {
        match self {
            KeyType::ActorStats => format!("actor_stats:{}", id),
        }
    }
}
