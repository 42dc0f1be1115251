use std::iter::FusedIterator;
use std::num::NonZeroU64;
use std::ops::{Index, IndexMut};

use slotmap::{DefaultKey, Key, KeyData};
use slotmap::hop::HopSlotMap;

use crate::static_assert_size;
use crate::base::Point;
use crate::dex::MonsterRace;

//////////////////////////////////////////////////////////////////////////////

// Monster

// A tracked enemy. The core never resolves monster identity itself: records
// are created when a monster is first perceived, updated every turn it is
// visible, and removed when it is confirmed dead or gone.
pub struct Monster {
    pub mid: MID,
    pub race: &'static MonsterRace,
    pub pos: Point,
    pub hp: i32,
    pub awake: bool,
    pub seen: bool,
    pub last_seen: i32,
}

impl Monster {
    fn new(mid: MID, race: &'static MonsterRace, pos: Point, turn: i32) -> Self {
        Self { mid, race, pos, hp: race.hp, awake: false, seen: true, last_seen: turn }
    }
}

//////////////////////////////////////////////////////////////////////////////

// MID

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct MID(NonZeroU64);
static_assert_size!(Option<MID>, 8);

impl Default for MID {
    fn default() -> Self {
        to_mid(DefaultKey::null())
    }
}

fn to_key(mid: MID) -> DefaultKey {
    KeyData::from_ffi(mid.0.get()).into()
}

fn to_mid(key: DefaultKey) -> MID {
    MID(NonZeroU64::new(key.data().as_ffi()).unwrap())
}

//////////////////////////////////////////////////////////////////////////////

// MonsterMap

type BaseMap = HopSlotMap<DefaultKey, Monster>;

#[derive(Default)]
pub struct MonsterMap(BaseMap);

impl MonsterMap {
    pub fn add(&mut self, race: &'static MonsterRace, pos: Point, turn: i32) -> MID {
        to_mid(self.0.insert_with_key(|x| Monster::new(to_mid(x), race, pos, turn)))
    }

    pub fn clear(&mut self) { self.0.clear(); }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn get(&self, mid: MID) -> Option<&Monster> { self.0.get(to_key(mid)) }

    pub fn get_mut(&mut self, mid: MID) -> Option<&mut Monster> { self.0.get_mut(to_key(mid)) }

    pub fn has(&self, mid: MID) -> bool { self.0.contains_key(to_key(mid)) }

    pub fn remove(&mut self, mid: MID) -> Option<Monster> { self.0.remove(to_key(mid)) }

    pub fn iter(&self) -> Iter<'_> { Iter(self.0.iter()) }

    pub fn iter_mut(&mut self) -> IterMut<'_> { IterMut(self.0.iter_mut()) }
}

impl Index<MID> for MonsterMap {
    type Output = Monster;
    fn index(&self, mid: MID) -> &Self::Output {
        self.get(mid).unwrap()
    }
}

impl IndexMut<MID> for MonsterMap {
    fn index_mut(&mut self, mid: MID) -> &mut Self::Output {
        self.get_mut(mid).unwrap()
    }
}

impl<'a> IntoIterator for &'a MonsterMap {
    type Item = (MID, &'a Monster);
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

impl<'a> IntoIterator for &'a mut MonsterMap {
    type Item = (MID, &'a mut Monster);
    type IntoIter = IterMut<'a>;
    fn into_iter(self) -> Self::IntoIter { self.iter_mut() }
}

//////////////////////////////////////////////////////////////////////////////

// MonsterMap iterators

pub struct Iter<'a>(slotmap::hop::Iter<'a, DefaultKey, Monster>);

pub struct IterMut<'a>(slotmap::hop::IterMut<'a, DefaultKey, Monster>);

impl<'a> FusedIterator for Iter<'a> {}

impl<'a> FusedIterator for IterMut<'a> {}

impl<'a> Iterator for Iter<'a> {
    type Item = (MID, &'a Monster);
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (to_mid(k), v))
    }
}

impl<'a> Iterator for IterMut<'a> {
    type Item = (MID, &'a mut Monster);
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (to_mid(k), v))
    }
}

//////////////////////////////////////////////////////////////////////////////
